//! Serial number read from physical addresses listed on the SoC device node.

use crate::early_boot::read_physical_halves;
use crate::pal::Platform;
use crate::serial::{SerialCache, SerialHalves, SerialRecord};
use crate::{Error, Result, property};

/// Property of the SoC device node holding the physical addresses of the low and high halves,
/// one cell each.
pub(crate) const SERIAL_ADDRS_PROPERTY: &str = "actions,serial-number-addrs";

/// The physical addresses of the low and high halves, in that order.
pub(crate) fn serial_addresses(platform: &impl Platform, node_path: &str) -> Result<(u64, u64)> {
    let value = platform
        .node_property(node_path, SERIAL_ADDRS_PROPERTY)
        .ok_or_else(|| {
            Error::config(format!("{node_path} has no '{SERIAL_ADDRS_PROPERTY}' property"))
        })?;

    let (low_addr, rest) = property::take_cells(&value, 1).ok_or_else(|| short(node_path))?;
    let (high_addr, _) = property::take_cells(rest, 1).ok_or_else(|| short(node_path))?;

    Ok((low_addr, high_addr))
}

fn short(node_path: &str) -> Error {
    Error::config(format!(
        "'{SERIAL_ADDRS_PROPERTY}' of {node_path} does not hold two addresses"
    ))
}

/// Copies the serial number from the addresses listed on the device node compatible with
/// `soc_compatible` and publishes the copy.
pub(crate) fn acquire(
    platform: &impl Platform,
    cache: &SerialCache,
    soc_compatible: &str,
) -> Result<SerialHalves> {
    if cache.is_published() {
        return Err(Error::AlreadyPublished);
    }

    let node_path = platform
        .find_compatible_node(soc_compatible)
        .ok_or_else(|| Error::NotFound {
            compatible: soc_compatible.to_string(),
        })?;

    let (low_addr, high_addr) = serial_addresses(platform, &node_path)?;
    let halves = read_physical_halves(platform, low_addr, high_addr)?;

    cache.publish(SerialRecord::new(halves.low(), halves.high()).leak())?;

    Ok(halves)
}
