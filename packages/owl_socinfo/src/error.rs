use std::io;

use thiserror::Error;

use crate::RegistryError;

/// Errors that can occur when reading or publishing the SoC identity.
///
/// Only [`Error::Config`] (for the mandatory `model` property), [`Error::NotSupported`] and
/// [`Error::Registration`] fail a probe. The remaining variants describe serial number
/// acquisition failures, which a probe absorbs by registering the SoC without a serial number.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No device tree node carries the expected `compatible` tag.
    #[error("no device tree node is compatible with '{compatible}'")]
    NotFound {
        /// The `compatible` string that was searched for.
        compatible: String,
    },

    /// A configuration value is missing or malformed.
    #[error("invalid device configuration: {problem}")]
    Config {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// Physical memory could not be mapped into the address space of the process.
    #[error("failed to map {len} bytes of physical memory at {phys_addr:#x}")]
    OutOfMemory {
        /// Physical address of the first byte that was to be mapped.
        phys_addr: u64,

        /// Number of bytes that were to be mapped.
        len: u64,

        /// The error reported by the operating system.
        #[source]
        source: io::Error,
    },

    /// The matched `compatible` string does not name a SoC variant in the catalog.
    #[error("'{compatible}' is not a supported Owl SoC variant")]
    NotSupported {
        /// The `compatible` string that failed to match.
        compatible: String,
    },

    /// The external registry refused the SoC device.
    #[error("failed to register SoC device")]
    Registration(#[source] RegistryError),

    /// The serial number cache was already populated earlier in the lifetime of the process.
    #[error("the SoC serial number has already been published")]
    AlreadyPublished,
}

/// A specialized `Result` type for SoC identity operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(problem: impl Into<String>) -> Self {
        Self::Config {
            problem: problem.into(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_memory_keeps_os_error_as_source() {
        let error = Error::OutOfMemory {
            phys_addr: 0x1000,
            len: 8,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };

        assert_eq!(
            error.to_string(),
            "failed to map 8 bytes of physical memory at 0x1000"
        );

        let source = std::error::Error::source(&error).expect("source is always set");
        assert!(source.is::<io::Error>());
    }

    #[test]
    fn config_helper_carries_problem() {
        let error = Error::config("root node has no 'model' property");

        assert!(matches!(error, Error::Config { ref problem } if problem.contains("model")));
    }
}
