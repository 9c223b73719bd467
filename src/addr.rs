//! Symmetric address translation.
//!
//! Every process exposes two symmetric regions with identical relative
//! layout: a static data region and a dynamically sized heap. A local address
//! inside either region names the same object on every peer once expressed as
//! a `(region, offset)` pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::likely::*;

/// A symmetric memory region, as exposed by the local process.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricRegion {
    /// Local base address.
    pub base: usize,

    /// Length in bytes.
    pub len: usize,
}

impl SymmetricRegion {
    /// Create a region descriptor.
    #[inline]
    pub const fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    /// Create a region descriptor covering the given memory.
    #[inline]
    pub fn from_slice(mem: &[u8]) -> Self {
        Self::new(mem.as_ptr() as usize, mem.len())
    }

    /// One past the last address of the region.
    #[inline(always)]
    pub fn end(&self) -> usize {
        self.base + self.len
    }

    /// Return `true` if `addr` lies inside the region.
    #[inline(always)]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.end()
    }

    #[inline(always)]
    fn overlaps(&self, other: &SymmetricRegion) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

impl fmt::Debug for SymmetricRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricRegion")
            .field("base", &format_args!("{:#x}", self.base))
            .field("len", &format_args!("{:#x}", self.len))
            .finish()
    }
}

/// Identifies one of the two symmetric regions on a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    /// Static data region.
    Data,

    /// Symmetric heap.
    Heap,
}

impl RegionId {
    /// Portal table index under which peers expose this region.
    #[inline(always)]
    pub const fn pt_index(self) -> u32 {
        match self {
            RegionId::Data => 8,
            RegionId::Heap => 9,
        }
    }
}

/// Where an operation lands on the target peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAccess {
    /// Target region.
    pub region: RegionId,

    /// Byte offset from the region base.
    pub offset: usize,
}

impl RemoteAccess {
    /// Return the access shifted forward by `delta` bytes.
    #[inline(always)]
    pub fn advance(self, delta: usize) -> Self {
        Self {
            region: self.region,
            offset: self.offset + delta,
        }
    }
}

/// Address classification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddrMode {
    /// Every address is checked against both regions; anything else is an
    /// addressing error.
    #[default]
    Checked,

    /// A single comparison against the heap base. Requires the data region
    /// to lie entirely below the heap; addresses are trusted.
    Unchecked,
}

/// Translates local symmetric addresses into remote accesses.
#[derive(Debug, Clone)]
pub struct AddrTranslator {
    data: SymmetricRegion,
    heap: SymmetricRegion,
    mode: AddrMode,
}

impl AddrTranslator {
    /// Create a translator over the given regions.
    ///
    /// The regions must not overlap. In [`AddrMode::Unchecked`] the data
    /// region must additionally end at or below the heap base.
    pub fn new(data: SymmetricRegion, heap: SymmetricRegion, mode: AddrMode) -> Result<Self> {
        if data.overlaps(&heap) {
            return Err(Error::InvalidConfig(format!(
                "symmetric regions overlap: data {:?}, heap {:?}",
                data, heap
            )));
        }
        if mode == AddrMode::Unchecked && data.end() > heap.base {
            return Err(Error::InvalidConfig(format!(
                "unchecked addressing requires the data region below the heap: data {:?}, heap {:?}",
                data, heap
            )));
        }
        Ok(Self { data, heap, mode })
    }

    /// Return the addressing mode.
    #[inline]
    pub fn mode(&self) -> AddrMode {
        self.mode
    }

    /// Translate a local symmetric address.
    #[inline]
    pub fn translate(&self, addr: usize) -> Result<RemoteAccess> {
        match self.mode {
            AddrMode::Checked => self.translate_checked(addr),
            AddrMode::Unchecked => Ok(self.translate_unchecked(addr)),
        }
    }

    #[inline]
    fn translate_checked(&self, addr: usize) -> Result<RemoteAccess> {
        if self.data.contains(addr) {
            Ok(RemoteAccess {
                region: RegionId::Data,
                offset: addr - self.data.base,
            })
        } else if likely(self.heap.contains(addr)) {
            Ok(RemoteAccess {
                region: RegionId::Heap,
                offset: addr - self.heap.base,
            })
        } else {
            Err(Error::OutsideSymmetric { addr })
        }
    }

    #[inline(always)]
    fn translate_unchecked(&self, addr: usize) -> RemoteAccess {
        if addr < self.heap.base {
            RemoteAccess {
                region: RegionId::Data,
                offset: addr.wrapping_sub(self.data.base),
            }
        } else {
            RemoteAccess {
                region: RegionId::Heap,
                offset: addr - self.heap.base,
            }
        }
    }
}
