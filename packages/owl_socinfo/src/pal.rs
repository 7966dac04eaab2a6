//! Platform Abstraction Layer (PAL). Every read of the device tree or of physical memory goes
//! through here, so the acquisition and publication logic can be tested against mocks.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

#[cfg(all(target_os = "linux", not(miri)))]
mod linux;
#[cfg(all(target_os = "linux", not(miri)))]
pub(crate) use linux::*;

// The fallback module is compiled in test mode on all platforms, under Miri, and as the primary
// implementation on platforms without a device tree. It is only glob-imported when it is the
// primary implementation; tests on Linux reach it via the explicit `fallback::` path.
#[cfg(any(test, miri, not(target_os = "linux")))]
pub(crate) mod fallback;

#[cfg(any(miri, not(target_os = "linux")))]
pub(crate) use fallback::*;
