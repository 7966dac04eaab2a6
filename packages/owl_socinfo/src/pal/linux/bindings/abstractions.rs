use std::fmt::Debug;
use std::io;

use crate::pal::MappedRange;

/// Bindings for FFI calls into the operating system.
///
/// All PAL FFI calls must go through this trait, enabling them to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    // sysconf(_SC_PAGESIZE)
    fn page_size(&self) -> io::Result<u64>;

    // mmap() of `len` bytes of /dev/mem at the page-aligned physical address `offset`.
    fn mmap_physical(&self, offset: u64, len: usize) -> io::Result<MappedRange>;

    // munmap() of a range previously returned by mmap_physical().
    fn munmap(&self, range: MappedRange) -> io::Result<()>;
}
