#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the owl-socinfo tool, which identifies the Owl SoC of the running
//! system and prints its identity record.
//!
//! This module is excluded from mutation testing because it only wires the library to the
//! console and the kernel randomness pool.

use std::io;
use std::process::ExitCode;

use argh::FromArgs;
use owl_socinfo::{
    RegistryError, SocAttributes, SocPlatform, SocRegistry, SocVariant, UrandomEntropySink,
};
use tracing::Level;

/// Identify the Actions Semi Owl SoC of this system and print its serial number.
#[derive(FromArgs)]
struct Args {
    /// compatible string of the SoC device node, detected from the device tree if omitted
    #[argh(option)]
    compatible: Option<String>,

    /// read the serial number from physical page 0 before probing, as done at boot
    #[argh(switch)]
    early: bool,

    /// log debug details to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

/// Registry that writes the identity record to stdout.
struct ConsoleRegistry;

impl SocRegistry for ConsoleRegistry {
    type Device = ();

    fn register(&self, attributes: SocAttributes) -> Result<(), RegistryError> {
        println!("family:        {}", attributes.family);
        println!("machine:       {}", attributes.model);
        println!("soc_id:        {}", attributes.soc_id);
        println!(
            "serial_number: {}",
            attributes.serial_number.as_deref().unwrap_or("(unknown)")
        );

        Ok(())
    }
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let args: Args = argh::from_env();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let platform = SocPlatform::current();

    if args.early {
        if let Err(error) = platform.init_early() {
            eprintln!("Error: early serial number read failed: {error}");
            return ExitCode::FAILURE;
        }
    }

    let compatible = match args.compatible {
        Some(compatible) => compatible,
        None => match platform.detect_variant() {
            Some(variant) => variant.compatible().to_string(),
            None => {
                let known = SocVariant::ALL.map(SocVariant::compatible).join(", ");
                eprintln!("Error: no SoC device node compatible with any of {known}");
                return ExitCode::FAILURE;
            }
        },
    };

    match platform.probe(&compatible, &ConsoleRegistry, &UrandomEntropySink::new()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
