use std::fmt::Debug;
use std::io;
use std::ptr::NonNull;

/// Everything the SoC identity logic needs from the operating system: read access to the
/// device tree and to physical memory.
///
/// Device tree nodes are addressed by absolute path, with `/` being the root node.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Size of a physical memory page in bytes. Always a power of two.
    fn page_size(&self) -> io::Result<u64>;

    /// Path of the first node (depth-first, children in name order) whose `compatible`
    /// property lists `compatible`, or `None` if there is no such node.
    fn find_compatible_node(&self, compatible: &str) -> Option<String>;

    /// Raw value of property `name` of the node at `node_path`, or `None` if the node or the
    /// property does not exist.
    fn node_property(&self, node_path: &str, name: &str) -> Option<Vec<u8>>;

    /// Maps the physical page with frame number `pfn` for a short-lived read.
    ///
    /// The mapping must be released via `unmap_page()` once the caller is done with it.
    fn map_page(&self, pfn: u64) -> io::Result<MappedRange>;

    /// Releases a mapping obtained from `map_page()`.
    fn unmap_page(&self, page: MappedRange);

    /// Maps `len` bytes of physical memory starting at `phys_addr`, which need not be page
    /// aligned, as write-back cacheable memory.
    ///
    /// The mapping is never released and remains valid until the process exits.
    fn map_durable(&self, phys_addr: u64, len: u64) -> io::Result<MappedRange>;
}

/// A range of readable virtual memory that maps some physical memory.
///
/// This is only an address range, it does not own the mapping. Whoever created the mapping
/// decides how long the range remains valid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct MappedRange {
    start: NonNull<u8>,
    len: usize,
}

// SAFETY: The range is just an address and a length. Mapped physical memory may be read from
// any thread; validity is governed by the owner of the mapping, not by the thread.
unsafe impl Send for MappedRange {}
// SAFETY: See above. The range itself is immutable.
unsafe impl Sync for MappedRange {}

impl MappedRange {
    /// # Safety
    ///
    /// `len` bytes starting at `start` must be readable for as long as the range (or any range
    /// derived from it) is read from.
    pub(crate) const unsafe fn new(start: NonNull<u8>, len: usize) -> Self {
        Self { start, len }
    }

    /// Creates a range over a leaked copy of `words`, aligned for `u32` access. Stands in for
    /// mapped memory in tests.
    #[cfg(test)]
    pub(crate) fn leak_words(words: &[u32]) -> Self {
        let words: &'static mut [u32] = Box::leak(words.to_vec().into_boxed_slice());
        let len = size_of_val(words);

        // SAFETY: Leaked memory stays readable until the process exits.
        unsafe { Self::new(NonNull::from(words).cast(), len) }
    }

    pub(crate) const fn start(&self) -> NonNull<u8> {
        self.start
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// The part of this range that starts `offset` bytes in and is `len` bytes long, or `None`
    /// if that does not fit inside this range.
    pub(crate) fn subrange(self, offset: usize, len: usize) -> Option<Self> {
        let end = offset.checked_add(len)?;

        if end > self.len {
            return None;
        }

        // SAFETY: We just verified that `offset + len` is within the range, so the offset
        // pointer stays inside the same mapping.
        let start = unsafe { self.start.add(offset) };

        Some(Self { start, len })
    }

    /// Reads a native-endian `u32` at `offset` bytes into the range, or `None` if the value
    /// does not fit inside the range.
    ///
    /// # Safety
    ///
    /// The memory behind the range must still be mapped.
    pub(crate) unsafe fn read_u32(&self, offset: usize) -> Option<u32> {
        let word = self.subrange(offset, size_of::<u32>())?;

        // SAFETY: The subrange is in bounds and the caller guarantees it is still mapped.
        // Firmware data carries no alignment guarantee, hence the unaligned read.
        Some(unsafe { word.start.cast::<u32>().read_unaligned() })
    }
}
