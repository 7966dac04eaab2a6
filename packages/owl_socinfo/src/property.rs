//! Decoding of raw device tree property values.
//!
//! Strings are NUL-terminated, string lists are NUL-separated strings and numbers are sequences
//! of big-endian 32-bit cells.

use std::str::from_utf8;

const CELL_SIZE: usize = size_of::<u32>();

/// The strings of a string list property such as `compatible`. Entries that are not valid
/// UTF-8 are skipped.
pub(crate) fn string_list(value: &[u8]) -> impl Iterator<Item = &str> {
    value
        .split(|byte| *byte == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| from_utf8(entry).ok())
}

/// The value of a string property, or `None` if it is not valid UTF-8.
pub(crate) fn string(value: &[u8]) -> Option<&str> {
    let terminated = value.split(|byte| *byte == 0).next().unwrap_or_default();

    from_utf8(terminated).ok()
}

/// The value of a single-cell property such as `#address-cells`.
pub(crate) fn single_cell(value: &[u8]) -> Option<u32> {
    let cell: [u8; CELL_SIZE] = value.try_into().ok()?;

    Some(u32::from_be_bytes(cell))
}

/// Splits a number of `cell_count` cells off the front of `value`.
///
/// Returns the number and the remaining bytes, or `None` if `cell_count` is not 1 or 2 or
/// `value` is too short.
pub(crate) fn take_cells(value: &[u8], cell_count: u32) -> Option<(u64, &[u8])> {
    let len = match cell_count {
        1 => CELL_SIZE,
        2 => CELL_SIZE.checked_mul(2)?,
        _ => return None,
    };

    let (number, rest) = value.split_at_checked(len)?;

    let number = number
        .chunks_exact(CELL_SIZE)
        .filter_map(single_cell)
        .fold(0_u64, |acc, cell| (acc << u32::BITS) | u64::from(cell));

    Some((number, rest))
}
