//! Detects the SoC variant from the device tree, probes it and collects the identity record
//! in memory instead of handing it to a system-information subsystem.

use std::sync::Mutex;

use owl_socinfo::{RegistryError, SocAttributes, SocPlatform, SocRegistry, UrandomEntropySink};

#[derive(Default)]
struct InMemoryRegistry {
    devices: Mutex<Vec<SocAttributes>>,
}

impl SocRegistry for InMemoryRegistry {
    type Device = usize;

    fn register(&self, attributes: SocAttributes) -> Result<usize, RegistryError> {
        let mut devices = self.devices.lock().map_err(|_poisoned| "registry lock poisoned")?;
        devices.push(attributes);
        Ok(devices.len())
    }
}

fn main() {
    let platform = SocPlatform::current();

    let Some(variant) = platform.detect_variant() else {
        println!("no Owl SoC device node in the device tree");
        return;
    };

    let registry = InMemoryRegistry::default();

    match platform.probe(variant.compatible(), &registry, &UrandomEntropySink::new()) {
        Ok(device) => {
            let devices = registry.devices.lock().unwrap();
            println!("registered device #{device}: {:#?}", devices.last());
        }
        Err(e) => println!("probe failed: {e}"),
    }
}
