//! Reads the SoC serial number the way early boot code would and prints it.
//!
//! On S500 machines this copies the serial number out of physical page 0, which requires read
//! access to `/dev/mem`. On any other machine the accessors keep returning zero.

use owl_socinfo::{SocPlatform, soc_serial_high, soc_serial_low};

fn main() {
    match SocPlatform::current().init_early() {
        Ok(true) => println!("serial number read from physical page 0"),
        Ok(false) => println!("this machine does not provide the serial number at boot"),
        Err(e) => println!("early serial number read failed: {e}"),
    }

    println!("low:  {:#010x}", soc_serial_low());
    println!("high: {:#010x}", soc_serial_high());
}
