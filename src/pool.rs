//! Fixed-capacity fragment pools.

use std::ptr::NonNull;

use crate::error::{Error, PoolKind, Result};
use crate::frag::*;
use crate::util::{free_list::FreeList, huge_alloc::*, math::roundup};

const CACHELINE_SIZE: usize = 64;

/// A pool of fragment records of one kind.
///
/// Allocation never blocks: it returns `None` when the pool is empty and
/// leaves draining to the caller.
pub(crate) struct FragPool<F: Fragment> {
    list: FreeList<F>,
}

impl<F: Fragment> FragPool<F> {
    fn with_records(count: usize, init: impl FnMut(usize) -> F) -> Self {
        Self {
            list: FreeList::new(count, init),
        }
    }

    /// Take a record from the pool.
    ///
    /// # Panics
    ///
    /// Panic if the record does not carry this pool's kind tag, which means
    /// records from different pools got mixed up.
    #[inline]
    pub fn alloc(&mut self) -> Option<u32> {
        let idx = self.list.alloc()?;
        assert_eq!(
            self.list.get(idx).kind(),
            F::KIND,
            "fragment {} in the wrong pool",
            idx
        );
        Some(idx)
    }

    /// Return a record to the pool.
    #[inline]
    pub fn release(&mut self, idx: u32) {
        self.list.release(idx);
    }

    #[inline]
    pub fn get(&self, idx: u32) -> &F {
        self.list.get(idx)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: u32) -> &mut F {
        self.list.get_mut(idx)
    }

    #[inline]
    pub fn is_allocated(&self, idx: u32) -> bool {
        self.list.is_allocated(idx)
    }

    /// Number of free records.
    #[inline]
    pub fn available(&self) -> usize {
        self.list.available()
    }

    /// Total number of records.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.list.capacity()
    }
}

/// Pool of bounce buffers, carved out of one page-aligned allocation.
pub(crate) struct BouncePool {
    frags: FragPool<BounceBuffer>,

    /// Usable bytes per buffer.
    buf_size: usize,

    /// Backing memory. Place after `frags` so it outlives the records.
    #[allow(unused)]
    mem: HugeAlloc,
}

impl BouncePool {
    /// Create a pool of `count` buffers of `buf_size` bytes each.
    pub fn new(count: usize, buf_size: usize) -> Result<Self> {
        let stride = roundup(buf_size, CACHELINE_SIZE);
        let total = stride
            .checked_mul(count)
            .ok_or_else(|| Error::InvalidConfig("bounce pool size overflows".into()))?;
        let mem = alloc_raw(total).ok_or(Error::PoolExhausted(PoolKind::Bounce))?;

        let base = mem.ptr;
        let frags = FragPool::with_records(count, |i| {
            // SAFETY: `i * stride < total`, within the same allocation.
            BounceBuffer::new(unsafe { NonNull::new_unchecked(base.as_ptr().add(i * stride)) })
        });
        Ok(Self {
            frags,
            buf_size,
            mem,
        })
    }

    /// Usable bytes per buffer.
    #[inline]
    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    /// Take a buffer and copy `data` into it. Return the buffer index and
    /// the address of the copy.
    #[inline]
    pub fn alloc_copy(&mut self, data: &[u8]) -> Option<(u32, *const u8)> {
        assert!(
            data.len() <= self.buf_size,
            "bounce buffer too small ({} > {})",
            data.len(),
            self.buf_size
        );
        let idx = self.frags.alloc()?;
        let dst = self.frags.get(idx).as_ptr();
        // SAFETY: the slot holds at least `buf_size` bytes and is owned by
        // this allocation until released.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) };
        Some((idx, dst as *const u8))
    }

    #[inline]
    pub fn release(&mut self, idx: u32) {
        self.frags.release(idx)
    }

    #[inline]
    pub fn is_allocated(&self, idx: u32) -> bool {
        self.frags.is_allocated(idx)
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.frags.available()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frags.capacity()
    }
}

/// Pool of long fragments.
pub(crate) type LongFragPool = FragPool<LongFrag>;

impl LongFragPool {
    /// Create a pool of `count` long fragments.
    pub fn new(count: usize) -> Self {
        Self::with_records(count, |_| LongFrag::new())
    }
}
