use std::io;

use crate::pal::{MappedRange, Platform};

/// Platform implementation for operating systems that expose neither a device tree nor
/// physical memory to user space.
///
/// The device tree appears empty and every mapping attempt fails, so probing reports a missing
/// `model` property and the serial number accessors keep returning zero.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

const PAGE_SIZE: u64 = 4096;

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "physical memory is not accessible on this platform",
    )
}

impl Platform for BuildTargetPlatform {
    fn page_size(&self) -> io::Result<u64> {
        Ok(PAGE_SIZE)
    }

    fn find_compatible_node(&self, _compatible: &str) -> Option<String> {
        None
    }

    fn node_property(&self, _node_path: &str, _name: &str) -> Option<Vec<u8>> {
        None
    }

    fn map_page(&self, _pfn: u64) -> io::Result<MappedRange> {
        Err(unsupported())
    }

    #[cfg_attr(test, mutants::skip)] // Nothing to observe, map_page() never succeeds.
    fn unmap_page(&self, _page: MappedRange) {}

    fn map_durable(&self, _phys_addr: u64, _len: u64) -> io::Result<MappedRange> {
        Err(unsupported())
    }
}
