#![cfg_attr(coverage_nightly, coverage(off))]

use std::fmt::Debug;
use std::io;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::linux::MockBindings;
use crate::pal::MappedRange;
use crate::pal::linux::{Bindings, BuildTargetBindings};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum BindingsFacade {
    Target(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),
}

impl BindingsFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetBindings)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockBindings) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Bindings for BindingsFacade {
    fn page_size(&self) -> io::Result<u64> {
        match self {
            Self::Target(bindings) => bindings.page_size(),
            #[cfg(test)]
            Self::Mock(mock) => mock.page_size(),
        }
    }

    fn mmap_physical(&self, offset: u64, len: usize) -> io::Result<MappedRange> {
        match self {
            Self::Target(bindings) => bindings.mmap_physical(offset, len),
            #[cfg(test)]
            Self::Mock(mock) => mock.mmap_physical(offset, len),
        }
    }

    fn munmap(&self, range: MappedRange) -> io::Result<()> {
        match self {
            Self::Target(bindings) => bindings.munmap(range),
            #[cfg(test)]
            Self::Mock(mock) => mock.munmap(range),
        }
    }
}

impl Debug for BindingsFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
