use tracing::{debug, error, info, warn};

#[cfg(test)]
use crate::pal::MockPlatform;
use crate::pal::{Platform, PlatformFacade};
use crate::serial::{SERIAL_NUMBER_LEN, SerialCache, SerialHalves};
use crate::{
    EntropySink, Error, Result, SOC_FAMILY, SerialSource, SocAttributes, SocRegistry, SocVariant,
    early_boot, physical_addresses, property, reserved_memory,
};

/// Entry point for identifying the Owl SoC the process runs on and publishing its serial
/// number.
///
/// # Example
///
/// ```no_run
/// use owl_socinfo::{SocPlatform, UrandomEntropySink, soc_serial_high, soc_serial_low};
/// # use owl_socinfo::{RegistryError, SocAttributes, SocRegistry};
/// # struct Sysfs;
/// # impl SocRegistry for Sysfs {
/// #     type Device = ();
/// #     fn register(&self, _: SocAttributes) -> Result<(), RegistryError> { Ok(()) }
/// # }
///
/// let platform = SocPlatform::current();
///
/// if let Some(variant) = platform.detect_variant() {
///     platform
///         .probe(variant.compatible(), &Sysfs, &UrandomEntropySink::new())
///         .unwrap();
/// }
///
/// println!("{:08x}{:08x}", soc_serial_high(), soc_serial_low());
/// ```
#[derive(Clone, Debug)]
pub struct SocPlatform {
    platform: PlatformFacade,
    serial: &'static SerialCache,
}

impl SocPlatform {
    /// The SoC platform of the running system, publishing into [`SerialCache::global()`].
    #[must_use]
    pub fn current() -> Self {
        Self {
            platform: PlatformFacade::target(),
            serial: SerialCache::global(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_mock(platform: MockPlatform, serial: &'static SerialCache) -> Self {
        Self {
            platform: PlatformFacade::from_mock(platform),
            serial,
        }
    }

    /// The cache that this platform publishes the serial number into.
    #[must_use]
    pub fn serial(&self) -> &'static SerialCache {
        self.serial
    }

    /// The catalog variant of the first SoC device node found in the device tree, if any.
    #[must_use]
    pub fn detect_variant(&self) -> Option<SocVariant> {
        SocVariant::ALL
            .into_iter()
            .find(|variant| self.platform.find_compatible_node(variant.compatible()).is_some())
    }

    /// Reads the serial number that the boot ROM of some machines leaves in physical page 0,
    /// before that memory is handed out for other uses.
    ///
    /// Returns `Ok(false)` without touching physical memory if the machine is not one that
    /// provides the serial number at boot.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the page cannot be mapped, [`Error::AlreadyPublished`] if a
    /// serial number was published before and [`Error::Config`] if the fixed offsets do not
    /// fit the page size of the system. Whether any of these is fatal is up to the caller.
    pub fn init_early(&self) -> Result<bool> {
        if !early_boot::is_early_boot_machine(&self.platform) {
            debug!("machine does not provide the serial number at boot");
            return Ok(false);
        }

        let halves = early_boot::acquire(&self.platform, self.serial)?;

        debug!(serial_number = %halves, "serial number read at boot");

        Ok(true)
    }

    /// Acquires the serial number of `variant` and publishes it.
    ///
    /// The serial sources of the variant are tried in catalog order. A source whose device
    /// tree node is absent passes on to the next one; any other outcome is final.
    ///
    /// Returns `Ok(None)` if no serial source is known for `variant`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no source is present in the device tree, [`Error::Config`] or
    /// [`Error::OutOfMemory`] if a present source cannot be read and
    /// [`Error::AlreadyPublished`] if a serial number was published before.
    pub fn acquire_serial(&self, variant: SocVariant) -> Result<Option<SerialHalves>> {
        let mut not_found = None;

        for &source in variant.descriptor().serial_sources() {
            match self.acquire_from(source, variant) {
                Err(error @ Error::NotFound { .. }) => {
                    debug!(?source, %error, "serial number source not present");
                    not_found = Some(error);
                }
                result => return result.map(Some),
            }
        }

        not_found.map_or(Ok(None), Err)
    }

    fn acquire_from(&self, source: SerialSource, variant: SocVariant) -> Result<SerialHalves> {
        match source {
            SerialSource::ReservedMemory => reserved_memory::acquire(&self.platform, self.serial),
            SerialSource::PhysicalAddresses => {
                physical_addresses::acquire(&self.platform, self.serial, variant.compatible())
            }
        }
    }

    /// Identifies the SoC whose device node matched `compatible`, registers its identity
    /// record with `registry` and mixes its serial number into `entropy`.
    ///
    /// Failure to read the serial number does not fail the probe: the SoC is then registered
    /// without a serial number and nothing is fed to `entropy`. The serial number is fed to an
    /// entropy sink only once per process, however many probes see it.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if `compatible` is not in the catalog, [`Error::Config`] if
    /// the device tree root has no usable `model` property and [`Error::Registration`] if
    /// `registry` refuses the device.
    pub fn probe<R: SocRegistry>(
        &self,
        compatible: &str,
        registry: &R,
        entropy: &impl EntropySink,
    ) -> Result<R::Device> {
        let variant = SocVariant::from_compatible(compatible).ok_or_else(|| Error::NotSupported {
            compatible: compatible.to_string(),
        })?;
        let descriptor = variant.descriptor();

        let model = self
            .platform
            .node_property("/", "model")
            .ok_or_else(|| Error::config("device tree root has no 'model' property"))?;
        let model = property::string(&model)
            .ok_or_else(|| Error::config("device tree root 'model' property is not UTF-8"))?
            .to_string();

        let serial = match self.acquire_serial(variant) {
            Ok(halves) => halves,
            // Published earlier, e.g. by the boot-time read, which has no entropy sink to feed.
            Err(Error::AlreadyPublished) => Some(self.serial.halves()),
            Err(error @ Error::OutOfMemory { .. }) => {
                error!(%error, "failed to map SoC serial number");
                None
            }
            Err(error) => {
                warn!(%error, "failed to read SoC serial number");
                None
            }
        };

        let serial_number = serial.map(|halves| halves.to_string());

        match &serial_number {
            Some(serial_number) => {
                debug_assert_eq!(serial_number.len(), SERIAL_NUMBER_LEN);

                if self.serial.claim_for_entropy() {
                    entropy.add_device_randomness(serial_number.as_bytes());
                }
            }
            None => debug!(soc_id = descriptor.name(), "no SoC serial number available"),
        }

        let attributes = SocAttributes {
            family: SOC_FAMILY,
            model,
            soc_id: descriptor.name(),
            serial_number,
        };

        let family = attributes.family;
        let soc_id = attributes.soc_id;
        let model = attributes.model.clone();

        let device = registry.register(attributes).map_err(Error::Registration)?;

        info!(%model, "SoC: {family} {soc_id}");

        Ok(device)
    }
}
