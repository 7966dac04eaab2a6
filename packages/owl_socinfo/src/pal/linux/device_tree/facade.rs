use std::fmt::Debug;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::linux::MockDeviceTree;
use crate::pal::linux::{BuildTargetDeviceTree, DeviceTree};

/// Enum to hide the different device tree sources behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum DeviceTreeFacade {
    Target(&'static BuildTargetDeviceTree),

    #[cfg(test)]
    Mock(Arc<MockDeviceTree>),
}

impl DeviceTreeFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetDeviceTree)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockDeviceTree) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl DeviceTree for DeviceTreeFacade {
    fn read_property(&self, node_path: &str, name: &str) -> Option<Vec<u8>> {
        match self {
            Self::Target(device_tree) => device_tree.read_property(node_path, name),
            #[cfg(test)]
            Self::Mock(mock) => mock.read_property(node_path, name),
        }
    }

    fn child_nodes(&self, node_path: &str) -> Vec<String> {
        match self {
            Self::Target(device_tree) => device_tree.child_nodes(node_path),
            #[cfg(test)]
            Self::Mock(mock) => mock.child_nodes(node_path),
        }
    }
}

impl Debug for DeviceTreeFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
