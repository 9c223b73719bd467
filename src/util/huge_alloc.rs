use crate::util::{likely::*, math::roundup};
use libc::*;
use std::ptr::{self, NonNull};

const HUGE_PAGE_SIZE: usize = 1 << 21;
const PAGE_SIZE: usize = 1 << 12;

enum AllocType {
    Mmap,
    Malloc,
}

/// Page-aligned, zero-initialized memory for registered pool storage.
pub(crate) struct HugeAlloc {
    pub ptr: NonNull<u8>,
    pub len: usize,
    alloc_type: AllocType,
}

impl Drop for HugeAlloc {
    fn drop(&mut self) {
        // SAFETY: FFI; the memory was obtained from the matching allocator.
        unsafe {
            match self.alloc_type {
                AllocType::Mmap => assert!(
                    munmap(self.ptr.as_ptr() as *mut c_void, self.len) == 0,
                    "munmap failed"
                ),
                AllocType::Malloc => free(self.ptr.as_ptr() as *mut c_void),
            }
        };
    }
}

#[inline]
fn alloc_mmap(len: usize, flags: i32) -> Option<NonNull<u8>> {
    // SAFETY: FFI.
    let ret = unsafe {
        mmap(
            ptr::null_mut(),
            len,
            PROT_READ | PROT_WRITE,
            MAP_PRIVATE | MAP_ANONYMOUS | flags,
            -1,
            0,
        )
    };

    if ret != MAP_FAILED {
        NonNull::new(ret as *mut u8)
    } else {
        None
    }
}

#[inline]
fn alloc_memalign(len: usize, align: usize) -> Option<NonNull<u8>> {
    let mut ptr = ptr::null_mut();
    // SAFETY: FFI.
    let ret = unsafe { posix_memalign(&mut ptr, align, len) };
    if likely(ret == 0) {
        // SAFETY: FFI; `posix_memalign` does not zero memory.
        unsafe { ptr::write_bytes(ptr as *mut u8, 0, len) };
        NonNull::new(ptr as *mut u8)
    } else {
        None
    }
}

/// Allocate memory, preferring huge pages when the request is large enough
/// to benefit from them.
///
/// Returns `None` only if every allocation strategy failed.
pub(crate) fn alloc_raw(len: usize) -> Option<HugeAlloc> {
    let len = len.max(1);

    // 1. Try to allocate huge pages.
    if len >= HUGE_PAGE_SIZE {
        let len = roundup(len, HUGE_PAGE_SIZE);
        if let Some(ptr) = alloc_mmap(len, MAP_HUGETLB) {
            return Some(HugeAlloc {
                ptr,
                len,
                alloc_type: AllocType::Mmap,
            });
        }

        log::warn!(
            "bounce pool: no {}MB of hugepages, falling back to normal pages",
            len >> 20
        );
    }

    // 2. Try to allocate normal pages.
    let len = roundup(len, PAGE_SIZE);
    if let Some(ptr) = alloc_mmap(len, 0) {
        return Some(HugeAlloc {
            ptr,
            len,
            alloc_type: AllocType::Mmap,
        });
    }

    log::warn!("bounce pool: mmap of {}KB failed, falling back to posix_memalign", len >> 10);

    // 3. Try to posix_memalign, align to page size.
    alloc_memalign(len, PAGE_SIZE).map(|ptr| HugeAlloc {
        ptr,
        len,
        alloc_type: AllocType::Malloc,
    })
}
