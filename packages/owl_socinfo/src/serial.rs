use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use derive_more::Display;

use crate::{Error, Result};

/// Length of the canonical serial number string: two zero-padded 32-bit hex words.
pub const SERIAL_NUMBER_LEN: usize = 16;

/// In-memory layout of the serial number as the firmware leaves it: two adjacent native-endian
/// 32-bit words, low half first.
#[derive(Debug)]
#[repr(C)]
pub(crate) struct SerialRecord {
    low: u32,
    high: u32,
}

impl SerialRecord {
    pub(crate) const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Moves a copied-out record to the heap for the remainder of the process lifetime, so it
    /// can be published in the same way as a record that lives in mapped memory.
    pub(crate) fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    fn halves(&self) -> SerialHalves {
        SerialHalves::new(self.low, self.high)
    }
}

/// The 64-bit unique serial number of the SoC, kept as the two 32-bit halves it is stored as.
///
/// An all-zero value means "no serial number". A SoC whose genuine serial number is zero cannot
/// be told apart from one whose serial number was never read.
///
/// The `Display` implementation emits the canonical serial number string: 16 lowercase hex
/// digits, high half first.
///
/// # Example
///
/// ```
/// use owl_socinfo::SerialHalves;
///
/// let serial = SerialHalves::new(0x1234_5678, 0x9abc_def0);
///
/// assert_eq!(serial.to_string(), "9abcdef012345678");
/// assert_eq!(u64::from(serial), 0x9abc_def0_1234_5678);
/// ```
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
#[display("{high:08x}{low:08x}")]
pub struct SerialHalves {
    low: u32,
    high: u32,
}

impl SerialHalves {
    /// Creates a serial number from its two halves.
    #[must_use]
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// The low 32 bits of the serial number.
    #[must_use]
    pub const fn low(&self) -> u32 {
        self.low
    }

    /// The high 32 bits of the serial number.
    #[must_use]
    pub const fn high(&self) -> u32 {
        self.high
    }

    /// Whether this is the all-zero "no serial number" value.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.low == 0 && self.high == 0
    }
}

impl From<SerialHalves> for u64 {
    fn from(value: SerialHalves) -> Self {
        (Self::from(value.high) << u32::BITS) | Self::from(value.low)
    }
}

impl From<u64> for SerialHalves {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "splitting into halves is intentional truncation"
    )]
    fn from(value: u64) -> Self {
        Self::new(value as u32, (value >> u32::BITS) as u32)
    }
}

/// Process-wide write-once cell holding the SoC serial number.
///
/// The cell holds a reference to the record rather than a copy of it. When the serial number
/// comes from reserved memory, the reference points straight into the mapping, which is never
/// released. Setting the reference is the publication point: both halves are already in place
/// before it becomes visible and are never written again, so readers need no further
/// synchronization and never block.
///
/// Before anything is published, both halves read as zero.
#[derive(Debug)]
pub struct SerialCache {
    record: OnceLock<&'static SerialRecord>,

    // Set once the published serial number has been mixed into an entropy pool.
    fed_to_entropy: AtomicBool,
}

static GLOBAL_SERIAL: SerialCache = SerialCache::new();

impl SerialCache {
    pub(crate) const fn new() -> Self {
        Self {
            record: OnceLock::new(),
            fed_to_entropy: AtomicBool::new(false),
        }
    }

    /// The cache shared by the whole process, which [`soc_serial_low()`] and
    /// [`soc_serial_high()`] read from.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_SERIAL
    }

    /// Publishes `record` to all current and future readers.
    ///
    /// Fails with [`Error::AlreadyPublished`] if a record has been published before, leaving
    /// the earlier record in place.
    pub(crate) fn publish(&self, record: &'static SerialRecord) -> Result<()> {
        self.record
            .set(record)
            .map_err(|_rejected| Error::AlreadyPublished)
    }

    /// Claims the published serial number for mixing into an entropy pool.
    ///
    /// Returns `true` to exactly one caller after publication, no matter how often the
    /// serial number is read or which acquisition path published it.
    pub(crate) fn claim_for_entropy(&self) -> bool {
        self.is_published() && !self.fed_to_entropy.swap(true, Ordering::AcqRel)
    }

    /// Whether a serial number has been published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.record.get().is_some()
    }

    /// Both halves of the serial number, read as a single consistent snapshot.
    ///
    /// Returns the all-zero value if nothing has been published.
    #[must_use]
    pub fn halves(&self) -> SerialHalves {
        self.record
            .get()
            .map(|record| record.halves())
            .unwrap_or_default()
    }

    /// The low half of the serial number, or 0 if nothing has been published.
    #[must_use]
    pub fn low(&self) -> u32 {
        self.record.get().map_or(0, |record| record.low)
    }

    /// The high half of the serial number, or 0 if nothing has been published.
    #[must_use]
    pub fn high(&self) -> u32 {
        self.record.get().map_or(0, |record| record.high)
    }
}

/// The low 32 bits of the SoC serial number, or 0 if it has not been read (yet).
///
/// Safe to call from any thread at any time, never blocks.
#[cfg_attr(test, mutants::skip)] // Trivial layer, we only test the underlying logic.
#[inline]
#[must_use]
pub fn soc_serial_low() -> u32 {
    SerialCache::global().low()
}

/// The high 32 bits of the SoC serial number, or 0 if it has not been read (yet).
///
/// Safe to call from any thread at any time, never blocks.
#[cfg_attr(test, mutants::skip)] // Trivial layer, we only test the underlying logic.
#[inline]
#[must_use]
pub fn soc_serial_high() -> u32 {
    SerialCache::global().high()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use static_assertions::{assert_eq_size, assert_impl_all};

    use super::*;

    assert_eq_size!(SerialRecord, u64);
    assert_impl_all!(SerialCache: Send, Sync);
    assert_impl_all!(SerialHalves: Send, Sync, Copy);

    #[test]
    fn fresh_cache_reads_zero() {
        let cache = SerialCache::new();

        assert!(!cache.is_published());
        assert_eq!(cache.low(), 0);
        assert_eq!(cache.high(), 0);
        assert!(cache.halves().is_absent());
    }

    #[test]
    fn published_record_is_visible() {
        let cache = SerialCache::new();

        cache
            .publish(SerialRecord::new(0x1234_5678, 0x9abc_def0).leak())
            .unwrap();

        assert!(cache.is_published());
        assert_eq!(cache.low(), 0x1234_5678);
        assert_eq!(cache.high(), 0x9abc_def0);
        assert_eq!(cache.halves().to_string(), "9abcdef012345678");
    }

    #[test]
    fn second_publish_is_rejected() {
        let cache = SerialCache::new();

        cache.publish(SerialRecord::new(1, 2).leak()).unwrap();

        let result = cache.publish(SerialRecord::new(3, 4).leak());

        assert!(matches!(result, Err(Error::AlreadyPublished)));
        assert_eq!(cache.halves(), SerialHalves::new(1, 2));
    }

    #[test]
    fn entropy_claim_is_granted_once_after_publication() {
        let cache = SerialCache::new();

        assert!(!cache.claim_for_entropy());

        cache.publish(SerialRecord::new(1, 2).leak()).unwrap();

        assert!(cache.claim_for_entropy());
        assert!(!cache.claim_for_entropy());
        assert!(!cache.claim_for_entropy());
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(SerialHalves::new(0x1, 0x2).to_string(), "0000000200000001");
        assert_eq!(SerialHalves::default().to_string(), "0000000000000000");
        assert_eq!(
            SerialHalves::new(u32::MAX, u32::MAX).to_string(),
            "ffffffffffffffff"
        );
        assert_eq!(SerialHalves::new(7, 0).to_string().len(), SERIAL_NUMBER_LEN);
    }

    #[test]
    fn u64_conversion_puts_high_half_on_top() {
        let serial = SerialHalves::from(0xdead_beef_0bad_f00d_u64);

        assert_eq!(serial.high(), 0xdead_beef);
        assert_eq!(serial.low(), 0x0bad_f00d);
        assert_eq!(u64::from(serial), 0xdead_beef_0bad_f00d);
    }

    #[test]
    fn concurrent_readers_never_see_torn_pair() {
        const READERS: usize = 8;
        const READS_PER_READER: usize = 10_000;

        let cache: &'static SerialCache = Box::leak(Box::new(SerialCache::new()));
        let expected = SerialHalves::new(0x1234_5678, 0x9abc_def0);
        let start = Arc::new(Barrier::new(READERS + 1));

        let readers = (0..READERS)
            .map(|_| {
                let start = Arc::clone(&start);

                thread::spawn(move || {
                    start.wait();

                    for _ in 0..READS_PER_READER {
                        let observed = cache.halves();
                        assert!(
                            observed.is_absent() || observed == expected,
                            "observed torn serial number {observed}"
                        );
                    }
                })
            })
            .collect::<Vec<_>>();

        start.wait();
        cache
            .publish(SerialRecord::new(expected.low(), expected.high()).leak())
            .unwrap();

        for reader in readers {
            reader.join().unwrap();
        }

        // Every reader that starts after publication sees the published pair.
        let late_readers = (0..READERS)
            .map(|_| thread::spawn(move || (cache.low(), cache.high())))
            .collect::<Vec<_>>();

        for reader in late_readers {
            assert_eq!(reader.join().unwrap(), (0x1234_5678, 0x9abc_def0));
        }
    }
}
