use std::error::Error as StdError;
use std::fs::OpenOptions;
use std::io::Write;

use tracing::debug;

/// Family name shared by every SoC this package identifies.
pub const SOC_FAMILY: &str = "Actions Semi Owl";

/// The identity record of a SoC, handed to a [`SocRegistry`] once per probe.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct SocAttributes {
    /// Always [`SOC_FAMILY`].
    pub family: &'static str,

    /// Board model, from the `model` property of the device tree root node.
    pub model: String,

    /// Display name of the SoC variant, e.g. `S500`.
    pub soc_id: &'static str,

    /// Canonical serial number string, or `None` if the serial number could not be read.
    pub serial_number: Option<String>,
}

/// Error type returned by [`SocRegistry`] implementations.
pub type RegistryError = Box<dyn StdError + Send + Sync>;

/// The system-information subsystem that SoC identity records are registered with.
#[cfg_attr(test, mockall::automock(type Device = u32;))]
pub trait SocRegistry {
    /// Handle to a registered SoC device, returned to the caller of the probe.
    type Device;

    /// Registers the SoC described by `attributes`.
    ///
    /// # Errors
    ///
    /// Any error is surfaced to the caller of the probe as [`crate::Error::Registration`].
    fn register(&self, attributes: SocAttributes) -> Result<Self::Device, RegistryError>;
}

/// Write-only collaborator that mixes device-specific bytes into a randomness pool.
///
/// The bytes are not credited as entropy; they only make the pool state differ between
/// otherwise identical devices.
#[cfg_attr(test, mockall::automock)]
pub trait EntropySink {
    /// Mixes `bytes` into the pool. Cannot fail from the point of view of the caller.
    fn add_device_randomness(&self, bytes: &[u8]);
}

/// Feeds the kernel randomness pool by writing to `/dev/urandom`, which mixes the bytes in
/// without crediting any entropy.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct UrandomEntropySink;

const URANDOM_PATH: &str = "/dev/urandom";

impl UrandomEntropySink {
    /// Creates a sink that writes to the kernel randomness pool.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

// Writes to the real kernel pool; there is nothing observable to test.
#[cfg_attr(coverage_nightly, coverage(off))]
impl EntropySink for UrandomEntropySink {
    fn add_device_randomness(&self, bytes: &[u8]) {
        let result = OpenOptions::new()
            .write(true)
            .open(URANDOM_PATH)
            .and_then(|mut pool| pool.write_all(bytes));

        if let Err(error) = result {
            debug!(%error, "could not mix device randomness into {URANDOM_PATH}");
        }
    }
}
