//! Serial number read from the reserved memory region that the bootloader fills in.

use tracing::debug;

use crate::pal::Platform;
use crate::serial::{SerialCache, SerialHalves, SerialRecord};
use crate::{Error, Result, property};

/// `compatible` tag of the reserved memory node that describes the serial number region.
pub(crate) const SERIAL_COMPATIBLE: &str = "actions,owl-soc-serial";

// Device tree defaults for a parent node without `#address-cells` or `#size-cells`.
const DEFAULT_ADDRESS_CELLS: u32 = 2;
const DEFAULT_SIZE_CELLS: u32 = 1;

/// Required alignment of the physical address of the in-place record.
const RECORD_ALIGN: u64 = 4;

/// A physical memory range described by a `reg` property.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ReservedRegion {
    pub(crate) phys_addr: u64,
    pub(crate) size: u64,
}

fn parent_path(node_path: &str) -> &str {
    match node_path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn cell_count(platform: &impl Platform, node_path: &str, name: &str, default: u32) -> Result<u32> {
    let Some(value) = platform.node_property(node_path, name) else {
        return Ok(default);
    };

    property::single_cell(&value)
        .ok_or_else(|| Error::config(format!("'{name}' of {node_path} is not a single cell")))
}

/// Decodes the first address/size pair of a `reg` property value.
pub(crate) fn parse_reg(
    value: &[u8],
    address_cells: u32,
    size_cells: u32,
) -> Option<ReservedRegion> {
    let (phys_addr, rest) = property::take_cells(value, address_cells)?;
    let (size, _) = property::take_cells(rest, size_cells)?;

    Some(ReservedRegion { phys_addr, size })
}

/// Locates the serial number region in the device tree.
pub(crate) fn find_region(platform: &impl Platform) -> Result<ReservedRegion> {
    let node_path = platform
        .find_compatible_node(SERIAL_COMPATIBLE)
        .ok_or_else(|| Error::NotFound {
            compatible: SERIAL_COMPATIBLE.to_string(),
        })?;

    let parent = parent_path(&node_path);
    let address_cells = cell_count(platform, parent, "#address-cells", DEFAULT_ADDRESS_CELLS)?;
    let size_cells = cell_count(platform, parent, "#size-cells", DEFAULT_SIZE_CELLS)?;

    let reg = platform
        .node_property(&node_path, "reg")
        .ok_or_else(|| Error::config(format!("{node_path} has no 'reg' property")))?;

    let region = parse_reg(&reg, address_cells, size_cells).ok_or_else(|| {
        Error::config(format!(
            "'reg' of {node_path} does not hold {address_cells} address and {size_cells} size cells"
        ))
    })?;

    if usize::try_from(region.size).is_ok_and(|size| size < size_of::<SerialRecord>()) {
        return Err(Error::config(format!(
            "serial number region of {node_path} is only {} bytes",
            region.size
        )));
    }

    Ok(region)
}

/// Maps the serial number region for the remainder of the process lifetime and publishes the
/// record that lives in it.
pub(crate) fn acquire(platform: &impl Platform, cache: &SerialCache) -> Result<SerialHalves> {
    if cache.is_published() {
        return Err(Error::AlreadyPublished);
    }

    let region = find_region(platform)?;

    if region.phys_addr.checked_rem(RECORD_ALIGN) != Some(0) {
        return Err(Error::config(format!(
            "serial number region at {:#x} is not {RECORD_ALIGN}-byte aligned",
            region.phys_addr
        )));
    }

    let mapping = platform
        .map_durable(region.phys_addr, region.size)
        .map_err(|source| Error::OutOfMemory {
            phys_addr: region.phys_addr,
            len: region.size,
            source,
        })?;

    let record_ptr = mapping.start().cast::<SerialRecord>();

    // Durable mappings are never released, so a mapping rejected here stays mapped.
    if mapping.len() < size_of::<SerialRecord>() || !record_ptr.as_ptr().is_aligned() {
        return Err(Error::config(format!(
            "serial number region at {:#x} cannot hold an aligned record",
            region.phys_addr
        )));
    }

    // SAFETY: The durable mapping is never released, we just checked size and alignment, and
    // the bootloader does not write the region once the operating system runs.
    let record: &'static SerialRecord = unsafe { record_ptr.as_ref() };

    cache.publish(record)?;

    debug!(
        phys_addr = region.phys_addr,
        size = region.size,
        "published serial number from reserved memory"
    );

    Ok(cache.halves())
}
