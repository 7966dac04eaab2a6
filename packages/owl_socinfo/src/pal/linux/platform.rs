use std::io;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::pal::linux::{Bindings, BindingsFacade, DeviceTree, DeviceTreeFacade};
use crate::pal::{MappedRange, Platform};
use crate::property;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform =
    BuildTargetPlatform::new(BindingsFacade::target(), DeviceTreeFacade::target());

/// Linux platform: the device tree comes from sysfs and physical memory from `/dev/mem`.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform {
    bindings: BindingsFacade,
    device_tree: DeviceTreeFacade,

    page_size: OnceLock<u64>,
}

impl BuildTargetPlatform {
    pub(crate) const fn new(bindings: BindingsFacade, device_tree: DeviceTreeFacade) -> Self {
        Self {
            bindings,
            device_tree,
            page_size: OnceLock::new(),
        }
    }
}

fn child_path(parent: &str, child: &str) -> String {
    if parent == "/" {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

fn to_usize(value: u64) -> io::Result<usize> {
    usize::try_from(value).map_err(|_overflow| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{value:#x} bytes do not fit in the address space"),
        )
    })
}

impl Platform for BuildTargetPlatform {
    fn page_size(&self) -> io::Result<u64> {
        if let Some(page_size) = self.page_size.get() {
            return Ok(*page_size);
        }

        let page_size = self.bindings.page_size()?;

        Ok(*self.page_size.get_or_init(|| page_size))
    }

    fn find_compatible_node(&self, compatible: &str) -> Option<String> {
        let mut pending = vec![String::from("/")];

        while let Some(node_path) = pending.pop() {
            let is_match = self
                .device_tree
                .read_property(&node_path, "compatible")
                .is_some_and(|value| property::string_list(&value).any(|c| c == compatible));

            if is_match {
                return Some(node_path);
            }

            // Pushed in reverse so that children are visited in name order.
            let children = self.device_tree.child_nodes(&node_path);
            pending.extend(
                children
                    .iter()
                    .rev()
                    .map(|child| child_path(&node_path, child)),
            );
        }

        None
    }

    fn node_property(&self, node_path: &str, name: &str) -> Option<Vec<u8>> {
        self.device_tree.read_property(node_path, name)
    }

    fn map_page(&self, pfn: u64) -> io::Result<MappedRange> {
        let page_size = self.page_size()?;

        let phys_addr = pfn.checked_mul(page_size).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("page frame number {pfn:#x} is beyond the physical address space"),
            )
        })?;

        self.bindings.mmap_physical(phys_addr, to_usize(page_size)?)
    }

    fn unmap_page(&self, page: MappedRange) {
        if let Err(error) = self.bindings.munmap(page) {
            warn!(%error, "failed to unmap physical page");
        }
    }

    fn map_durable(&self, phys_addr: u64, len: u64) -> io::Result<MappedRange> {
        let page_size = self.page_size()?;

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "page size is a non-zero power of two and the offset is at most the address"
        )]
        let (aligned_addr, page_offset) = {
            let page_offset = phys_addr % page_size;
            (phys_addr - page_offset, page_offset)
        };

        let map_len = page_offset.checked_add(len).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{len:#x} bytes at {phys_addr:#x} overflow the physical address space"),
            )
        })?;

        let mapping = self
            .bindings
            .mmap_physical(aligned_addr, to_usize(map_len)?)?;

        debug!(
            phys_addr,
            len, "mapped physical memory for the remainder of the process lifetime"
        );

        mapping
            .subrange(to_usize(page_offset)?, to_usize(len)?)
            .ok_or_else(|| io::Error::other("mapping is shorter than requested"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::pal::linux::{MockBindings, MockDeviceTree};

    const PAGE_SIZE: u64 = 4096;

    fn bindings_with_page_size() -> MockBindings {
        let mut bindings = MockBindings::new();
        bindings.expect_page_size().return_once(|| Ok(PAGE_SIZE));
        bindings
    }

    fn platform(bindings: MockBindings, device_tree: MockDeviceTree) -> BuildTargetPlatform {
        BuildTargetPlatform::new(
            BindingsFacade::from_mock(bindings),
            DeviceTreeFacade::from_mock(device_tree),
        )
    }

    /// Structure:
    /// ```text
    /// /                       compatible = "roseapple,pi", "actions,s500"
    ///   memory@0
    ///   reserved-memory
    ///     serial@3fff0000     compatible = "actions,owl-soc-serial"
    ///   soc                   compatible = "simple-bus"
    ///     socinfo             compatible = "actions,s500-soc"
    /// ```
    fn roseapple_device_tree() -> MockDeviceTree {
        let mut device_tree = MockDeviceTree::new();

        device_tree
            .expect_read_property()
            .returning(|node_path, name| match (node_path, name) {
                ("/", "compatible") => Some(b"roseapple,pi\0actions,s500\0".to_vec()),
                ("/reserved-memory/serial@3fff0000", "compatible") => {
                    Some(b"actions,owl-soc-serial\0".to_vec())
                }
                ("/soc", "compatible") => Some(b"simple-bus\0".to_vec()),
                ("/soc/socinfo", "compatible") => Some(b"actions,s500-soc\0".to_vec()),
                _ => None,
            });

        device_tree
            .expect_child_nodes()
            .returning(|node_path| match node_path {
                "/" => vec![
                    "memory@0".to_string(),
                    "reserved-memory".to_string(),
                    "soc".to_string(),
                ],
                "/reserved-memory" => vec!["serial@3fff0000".to_string()],
                "/soc" => vec!["socinfo".to_string()],
                _ => Vec::new(),
            });

        device_tree
    }

    #[test]
    fn finds_nested_compatible_node() {
        let platform = platform(MockBindings::new(), roseapple_device_tree());

        assert_eq!(
            platform.find_compatible_node("actions,owl-soc-serial"),
            Some("/reserved-memory/serial@3fff0000".to_string())
        );
        assert_eq!(
            platform.find_compatible_node("actions,s500-soc"),
            Some("/soc/socinfo".to_string())
        );
    }

    #[test]
    fn root_node_can_match() {
        let platform = platform(MockBindings::new(), roseapple_device_tree());

        assert_eq!(
            platform.find_compatible_node("actions,s500"),
            Some("/".to_string())
        );
    }

    #[test]
    fn missing_compatible_is_none() {
        let platform = platform(MockBindings::new(), roseapple_device_tree());

        assert_eq!(platform.find_compatible_node("actions,s900-soc"), None);
    }

    #[test]
    fn first_match_in_name_order_wins() {
        let mut device_tree = MockDeviceTree::new();

        device_tree
            .expect_read_property()
            .returning(|node_path, _| match node_path {
                "/a" | "/b" => Some(b"vendor,thing\0".to_vec()),
                _ => None,
            });
        device_tree
            .expect_child_nodes()
            .returning(|node_path| match node_path {
                "/" => vec!["a".to_string(), "b".to_string()],
                _ => Vec::new(),
            });

        let platform = platform(MockBindings::new(), device_tree);

        assert_eq!(
            platform.find_compatible_node("vendor,thing"),
            Some("/a".to_string())
        );
    }

    #[test]
    fn page_size_is_queried_once() {
        let platform = platform(bindings_with_page_size(), MockDeviceTree::new());

        assert_eq!(platform.page_size().unwrap(), PAGE_SIZE);
        assert_eq!(platform.page_size().unwrap(), PAGE_SIZE);
    }

    #[test]
    fn page_size_failure_propagates_and_is_retried() {
        let mut bindings = MockBindings::new();
        let mut calls = 0;
        bindings.expect_page_size().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(io::Error::from(io::ErrorKind::InvalidInput))
            } else {
                Ok(PAGE_SIZE)
            }
        });
        bindings.expect_mmap_physical().never();

        let platform = platform(bindings, MockDeviceTree::new());

        let error = platform.map_page(0).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);

        assert_eq!(platform.page_size().unwrap(), PAGE_SIZE);
    }

    #[test]
    fn map_page_maps_whole_frame() {
        let mut bindings = bindings_with_page_size();
        let page = MappedRange::leak_words(&[0; 1024]);

        bindings
            .expect_mmap_physical()
            .with(eq(3 * PAGE_SIZE), eq(4096))
            .once()
            .return_once(move |_, _| Ok(page));

        let platform = platform(bindings, MockDeviceTree::new());

        assert_eq!(platform.map_page(3).unwrap(), page);
    }

    #[test]
    fn map_page_beyond_address_space_is_error() {
        let platform = platform(bindings_with_page_size(), MockDeviceTree::new());

        let error = platform.map_page(u64::MAX).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn unmap_failure_is_absorbed() {
        let mut bindings = MockBindings::new();
        bindings
            .expect_munmap()
            .once()
            .return_once(|_| Err(io::Error::from(io::ErrorKind::InvalidInput)));

        let platform = platform(bindings, MockDeviceTree::new());

        platform.unmap_page(MappedRange::leak_words(&[0; 4]));
    }

    #[test]
    fn map_durable_rounds_down_to_page() {
        let mut bindings = bindings_with_page_size();

        // 0x10 bytes of page head followed by the 8 requested bytes.
        let mapping = MappedRange::leak_words(&[0, 0, 0, 0, 0x1234_5678, 0x9abc_def0]);

        bindings
            .expect_mmap_physical()
            .with(eq(0x3fff_f000), eq(0x18))
            .once()
            .return_once(move |_, _| Ok(mapping));

        let platform = platform(bindings, MockDeviceTree::new());

        let range = platform.map_durable(0x3fff_f010, 8).unwrap();

        assert_eq!(range.len(), 8);
        // SAFETY: Leaked test memory is never unmapped.
        unsafe {
            assert_eq!(range.read_u32(0), Some(0x1234_5678));
        }
        // SAFETY: Leaked test memory is never unmapped.
        unsafe {
            assert_eq!(range.read_u32(4), Some(0x9abc_def0));
        }
    }

    #[test]
    fn map_durable_propagates_mmap_error() {
        let mut bindings = bindings_with_page_size();
        bindings
            .expect_mmap_physical()
            .return_once(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let platform = platform(bindings, MockDeviceTree::new());

        let error = platform.map_durable(0x3fff_0000, 8).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
    }
}
