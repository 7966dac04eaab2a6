/// Where the serial number of a SoC variant can be read from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SerialSource {
    /// The bootloader leaves the serial number in a reserved memory region, found via the
    /// `actions,owl-soc-serial` device tree node.
    ReservedMemory,

    /// The SoC device node lists the physical addresses of the two halves in its
    /// `actions,serial-number-addrs` property.
    PhysicalAddresses,
}

/// Static description of one SoC variant in the catalog.
#[derive(Debug, Eq, PartialEq)]
pub struct VariantDescriptor {
    name: &'static str,
    serial_sources: &'static [SerialSource],
}

impl VariantDescriptor {
    /// Display name of the SoC, used as the SoC ID of the identity record.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The places the serial number of this SoC may be read from, in the order they are tried.
    ///
    /// Empty if no way to read the serial number is known. Probing still succeeds in that case
    /// but the identity record carries no serial number.
    #[must_use]
    pub const fn serial_sources(&self) -> &'static [SerialSource] {
        self.serial_sources
    }
}

static S500: VariantDescriptor = VariantDescriptor {
    name: "S500",
    serial_sources: &[SerialSource::ReservedMemory, SerialSource::PhysicalAddresses],
};

// TODO: S700 and S900 bootloaders do not publish the serial number region yet.
static S700: VariantDescriptor = VariantDescriptor {
    name: "S700",
    serial_sources: &[],
};

static S900: VariantDescriptor = VariantDescriptor {
    name: "S900",
    serial_sources: &[],
};

/// The Owl SoC variants this package knows how to identify.
///
/// # Example
///
/// ```
/// use owl_socinfo::{SerialSource, SocVariant};
///
/// let variant = SocVariant::from_compatible("actions,s500-soc").unwrap();
///
/// assert_eq!(variant.descriptor().name(), "S500");
/// assert_eq!(
///     variant.descriptor().serial_sources().first(),
///     Some(&SerialSource::ReservedMemory)
/// );
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SocVariant {
    /// Actions Semi S500 (quad Cortex-A9).
    S500,

    /// Actions Semi S700 (quad Cortex-A53).
    S700,

    /// Actions Semi S900 (quad Cortex-A53).
    S900,
}

impl SocVariant {
    /// Every variant in the catalog, in match table order.
    pub const ALL: [Self; 3] = [Self::S500, Self::S700, Self::S900];

    /// Resolves the variant whose SoC device node carries `compatible`.
    ///
    /// Returns `None` if the string does not name a variant in the catalog.
    #[must_use]
    pub fn from_compatible(compatible: &str) -> Option<Self> {
        match compatible {
            "actions,s500-soc" => Some(Self::S500),
            "actions,s700-soc" => Some(Self::S700),
            "actions,s900-soc" => Some(Self::S900),
            _ => None,
        }
    }

    /// The device tree `compatible` string of the SoC device node of this variant.
    #[must_use]
    pub const fn compatible(self) -> &'static str {
        match self {
            Self::S500 => "actions,s500-soc",
            Self::S700 => "actions,s700-soc",
            Self::S900 => "actions,s900-soc",
        }
    }

    /// The static catalog entry of this variant.
    #[must_use]
    pub const fn descriptor(self) -> &'static VariantDescriptor {
        match self {
            Self::S500 => &S500,
            Self::S700 => &S700,
            Self::S900 => &S900,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_compatible() {
        for variant in SocVariant::ALL {
            assert_eq!(SocVariant::from_compatible(variant.compatible()), Some(variant));
        }
    }

    #[test]
    fn only_s500_has_serial_source() {
        let with_source = SocVariant::ALL
            .into_iter()
            .filter(|v| !v.descriptor().serial_sources().is_empty())
            .collect::<Vec<_>>();

        assert_eq!(with_source, vec![SocVariant::S500]);
    }

    #[test]
    fn s500_prefers_reserved_memory() {
        assert_eq!(
            SocVariant::S500.descriptor().serial_sources(),
            &[SerialSource::ReservedMemory, SerialSource::PhysicalAddresses]
        );
    }

    #[test]
    fn names_match_catalog() {
        assert_eq!(SocVariant::S500.descriptor().name(), "S500");
        assert_eq!(SocVariant::S700.descriptor().name(), "S700");
        assert_eq!(SocVariant::S900.descriptor().name(), "S900");
    }

    #[test]
    fn unknown_compatible_is_none() {
        assert_eq!(SocVariant::from_compatible("actions,s500"), None);
        assert_eq!(SocVariant::from_compatible("actions,s600-soc"), None);
        assert_eq!(SocVariant::from_compatible(""), None);
    }
}
