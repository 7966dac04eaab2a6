use std::fmt::Debug;
use std::io;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockPlatform;
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, MappedRange, Platform};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Platform for PlatformFacade {
    fn page_size(&self) -> io::Result<u64> {
        match self {
            Self::Target(p) => p.page_size(),
            #[cfg(test)]
            Self::Mock(p) => p.page_size(),
        }
    }

    fn find_compatible_node(&self, compatible: &str) -> Option<String> {
        match self {
            Self::Target(p) => p.find_compatible_node(compatible),
            #[cfg(test)]
            Self::Mock(p) => p.find_compatible_node(compatible),
        }
    }

    fn node_property(&self, node_path: &str, name: &str) -> Option<Vec<u8>> {
        match self {
            Self::Target(p) => p.node_property(node_path, name),
            #[cfg(test)]
            Self::Mock(p) => p.node_property(node_path, name),
        }
    }

    fn map_page(&self, pfn: u64) -> io::Result<MappedRange> {
        match self {
            Self::Target(p) => p.map_page(pfn),
            #[cfg(test)]
            Self::Mock(p) => p.map_page(pfn),
        }
    }

    fn unmap_page(&self, page: MappedRange) {
        match self {
            Self::Target(p) => p.unmap_page(page),
            #[cfg(test)]
            Self::Mock(p) => p.unmap_page(page),
        }
    }

    fn map_durable(&self, phys_addr: u64, len: u64) -> io::Result<MappedRange> {
        match self {
            Self::Target(p) => p.map_durable(phys_addr, len),
            #[cfg(test)]
            Self::Mock(p) => p.map_durable(phys_addr, len),
        }
    }
}

impl From<&'static BuildTargetPlatform> for PlatformFacade {
    fn from(p: &'static BuildTargetPlatform) -> Self {
        Self::Target(p)
    }
}

#[cfg(test)]
impl From<MockPlatform> for PlatformFacade {
    fn from(p: MockPlatform) -> Self {
        Self::Mock(Arc::new(p))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
