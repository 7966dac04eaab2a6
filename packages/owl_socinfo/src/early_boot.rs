//! Early-boot serial number read for the S500 machine.
//!
//! The S500 boot ROM leaves the serial number at the start of physical memory, where it is
//! only valid until something else claims the page. This path copies it out through a
//! short-lived page mapping before any driver runs.

use tracing::debug;

use crate::pal::{MappedRange, Platform};
use crate::serial::{SerialCache, SerialHalves, SerialRecord};
use crate::{Error, Result, property};

/// Root node `compatible` entry of machines that provide the serial number at boot.
pub(crate) const MACHINE_COMPATIBLE: &str = "actions,s500";

/// Physical address of the low half of the serial number.
pub(crate) const SERIAL_LOW_ADDR: u64 = 0x800;

/// Physical address of the high half of the serial number.
pub(crate) const SERIAL_HIGH_ADDR: u64 = 0x804;

// Both halves together.
const SERIAL_WORDS_LEN: u64 = 8;

/// Whether the root node of the device tree declares the machine as one whose boot ROM leaves
/// the serial number in physical page 0.
pub(crate) fn is_early_boot_machine(platform: &impl Platform) -> bool {
    platform
        .node_property("/", "compatible")
        .is_some_and(|value| property::string_list(&value).any(|c| c == MACHINE_COMPATIBLE))
}

/// A physical page mapped for the lifetime of the guard.
struct ScopedPage<'a, P: Platform> {
    platform: &'a P,
    page: MappedRange,
}

impl<'a, P: Platform> ScopedPage<'a, P> {
    fn map(platform: &'a P, pfn: u64, page_size: u64) -> Result<Self> {
        let page = platform.map_page(pfn).map_err(|source| Error::OutOfMemory {
            phys_addr: pfn.saturating_mul(page_size),
            len: page_size,
            source,
        })?;

        Ok(Self { platform, page })
    }

    fn read_u32(&self, offset: u64) -> Option<u32> {
        let offset = usize::try_from(offset).ok()?;

        // SAFETY: The page stays mapped until the guard is dropped.
        unsafe { self.page.read_u32(offset) }
    }
}

impl<P: Platform> Drop for ScopedPage<'_, P> {
    fn drop(&mut self) {
        self.platform.unmap_page(self.page);
    }
}

/// Splits a physical address into its page frame number and the offset within that page.
fn split_address(addr: u64, page_size: u64) -> Option<(u64, u64)> {
    Some((addr.checked_div(page_size)?, addr.checked_rem(page_size)?))
}

/// Reads the two halves of the serial number from physical memory.
///
/// Both halves must be on the same page, which is mapped only for the duration of the call.
/// Also used for SoC device nodes that list the addresses of the halves explicitly.
pub(crate) fn read_physical_halves(
    platform: &impl Platform,
    low_addr: u64,
    high_addr: u64,
) -> Result<SerialHalves> {
    let page_size = platform.page_size().map_err(|source| Error::OutOfMemory {
        phys_addr: low_addr,
        len: SERIAL_WORDS_LEN,
        source,
    })?;

    let (low_pfn, low_offset) = split_address(low_addr, page_size)
        .ok_or_else(|| Error::config("platform reported a zero page size"))?;
    let (high_pfn, high_offset) = split_address(high_addr, page_size)
        .ok_or_else(|| Error::config("platform reported a zero page size"))?;

    if low_pfn != high_pfn {
        return Err(Error::config(format!(
            "serial number halves at {low_addr:#x} and {high_addr:#x} are not on the same page"
        )));
    }

    let page = ScopedPage::map(platform, low_pfn, page_size)?;

    let halves = page
        .read_u32(low_offset)
        .zip(page.read_u32(high_offset))
        .map(|(low, high)| SerialHalves::new(low, high))
        .ok_or_else(|| {
            Error::config(format!(
                "serial number halves at {low_addr:#x} and {high_addr:#x} cross the page end"
            ))
        })?;

    debug!(low_addr, high_addr, "read serial number from physical memory");

    Ok(halves)
}

/// Copies the serial number out of physical page 0 and publishes the copy.
pub(crate) fn acquire(platform: &impl Platform, cache: &SerialCache) -> Result<SerialHalves> {
    if cache.is_published() {
        return Err(Error::AlreadyPublished);
    }

    let halves = read_physical_halves(platform, SERIAL_LOW_ADDR, SERIAL_HIGH_ADDR)?;

    cache.publish(SerialRecord::new(halves.low(), halves.high()).leak())?;

    Ok(halves)
}
