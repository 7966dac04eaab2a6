use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::ptr::{self, NonNull};

use crate::pal::MappedRange;
use crate::pal::linux::Bindings;

/// Exposes all of physical memory. Opened without `O_SYNC`, so mappings are cacheable.
const DEV_MEM: &str = "/dev/mem";

/// FFI bindings that target the real operating system that the build is targeting.
///
/// You would only use different bindings in PAL unit tests that need to use mock bindings.
/// Even then, whenever possible, unit tests should use real bindings for maximum realism.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

// Real OS bindings are excluded from coverage measurement because:
// 1. Mapping /dev/mem requires root and a kernel without STRICT_DEVMEM.
// 2. Error paths require OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Bindings for BuildTargetBindings {
    fn page_size(&self) -> io::Result<u64> {
        // SAFETY: No safety requirements.
        let result = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

        u64::try_from(result).map_err(|_negative| io::Error::last_os_error())
    }

    fn mmap_physical(&self, offset: u64, len: usize) -> io::Result<MappedRange> {
        let offset = libc::off_t::try_from(offset).map_err(|_overflow| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("physical address {offset:#x} is out of range for mmap()"),
            )
        })?;

        let dev_mem = File::open(DEV_MEM)?;

        // SAFETY: We pass a valid open descriptor and let the kernel choose the address, so no
        // existing mapping can be affected.
        let address = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                dev_mem.as_raw_fd(),
                offset,
            )
        };

        if address == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        // The mapping stays valid after the descriptor is closed, so `dev_mem` may drop here.
        let start = NonNull::new(address.cast::<u8>())
            .ok_or_else(|| io::Error::other("mmap() returned a null mapping"))?;

        // SAFETY: The kernel just mapped `len` readable bytes at `start`. They remain mapped
        // until munmap() is called on this range.
        Ok(unsafe { MappedRange::new(start, len) })
    }

    fn munmap(&self, range: MappedRange) -> io::Result<()> {
        // SAFETY: The range was returned by mmap_physical() and the caller guarantees that
        // nothing reads from it any more.
        let result = unsafe { libc::munmap(range.start().as_ptr().cast(), range.len()) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
