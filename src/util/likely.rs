//! Branch-weight hints for the issue and drain paths.

#[cold]
#[inline(never)]
fn cold_path() {}

/// Mark `b == true` as the expected outcome of a branch.
#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if !b {
        cold_path();
    }
    b
}

/// Mark `b == false` as the expected outcome of a branch.
#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold_path();
    }
    b
}
