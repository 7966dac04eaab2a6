#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Identity of Actions Semi Owl SoCs (S500, S700, S900): family, board model and the unique
//! 64-bit serial number that the boot firmware leaves in memory.
//!
//! The serial number is read once per process, from a reserved memory region that the bootloader
//! fills in or, on S500 machines, directly from physical memory: page 0 at boot, or the addresses
//! listed on the SoC device node. Once published it can be
//! read from any thread via [`soc_serial_low()`] and [`soc_serial_high()`], which return 0 until
//! then.
//!
//! The identity record is handed to a [`SocRegistry`] supplied by the caller, and the serial
//! number is mixed into an [`EntropySink`] so that otherwise identical devices start out with
//! different randomness pool states.
//!
//! ```no_run
//! use owl_socinfo::{SocPlatform, soc_serial_high, soc_serial_low};
//!
//! let platform = SocPlatform::current();
//!
//! // On S500 machines, this copies the serial number out of page 0.
//! platform.init_early().unwrap();
//!
//! println!("{:08x}{:08x}", soc_serial_high(), soc_serial_low());
//! ```
//!
//! Reading physical memory requires access to `/dev/mem`. On operating systems without a device
//! tree, probing fails for lack of a board model and the serial number stays zero.

mod catalog;
mod early_boot;
mod error;
mod pal;
mod physical_addresses;
mod property;
mod registration;
mod reserved_memory;
mod serial;
mod soc_platform;

pub use catalog::*;
pub use error::*;
pub use registration::*;
pub use serial::*;
pub use soc_platform::SocPlatform;
