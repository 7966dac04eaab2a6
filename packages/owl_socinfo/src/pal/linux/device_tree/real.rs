use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::pal::linux::DeviceTree;

/// Where current kernels publish the device tree.
const SYSFS_DEVICE_TREE: &str = "/sys/firmware/devicetree/base";

/// Legacy location, a symlink to the sysfs one on current kernels.
const PROCFS_DEVICE_TREE: &str = "/proc/device-tree";

/// The device tree of the real operating system that the build is targeting.
///
/// You would only use different device trees in PAL unit tests that need to use a mock.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetDeviceTree;

static ROOT: OnceLock<PathBuf> = OnceLock::new();

impl BuildTargetDeviceTree {
    fn root() -> &'static Path {
        ROOT.get_or_init(|| {
            [SYSFS_DEVICE_TREE, PROCFS_DEVICE_TREE]
                .into_iter()
                .map(Path::new)
                .find(|candidate| candidate.is_dir())
                .unwrap_or_else(|| Path::new(SYSFS_DEVICE_TREE))
                .to_path_buf()
        })
    }

    fn node_dir(node_path: &str) -> PathBuf {
        Self::root().join(node_path.trim_start_matches('/'))
    }
}

// Real device tree access is excluded from coverage measurement because it is only populated
// on device tree based systems, which CI runners are not.
#[cfg_attr(coverage_nightly, coverage(off))]
impl DeviceTree for BuildTargetDeviceTree {
    fn read_property(&self, node_path: &str, name: &str) -> Option<Vec<u8>> {
        fs::read(Self::node_dir(node_path).join(name)).ok()
    }

    fn child_nodes(&self, node_path: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(Self::node_dir(node_path)) else {
            return Vec::new();
        };

        let mut children = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect::<Vec<_>>();

        children.sort_unstable();
        children
    }
}
