//! Fragments: the records tracked by the completion machinery.
//!
//! Every event-generating operation carries exactly one fragment reference
//! as its user-context tag. When the completion event is drained the tag is
//! decoded back into a [`FragRef`] to find the record to release.

use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::type_alias::UserCtx;

/// Fragment type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FragKind {
    /// Pool-owned copy of eager outbound data.
    Bounce = 0x01,

    /// Tracking record for data sent straight from the caller's buffer.
    Long = 0x02,
}

impl FragKind {
    #[inline(always)]
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(FragKind::Bounce),
            0x02 => Some(FragKind::Long),
            _ => None,
        }
    }
}

/// Reference to a fragment, by kind and pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragRef {
    Bounce(u32),
    Long(u32),
}

impl FragRef {
    /// Return the kind of the referenced fragment.
    #[inline(always)]
    pub fn kind(self) -> FragKind {
        match self {
            FragRef::Bounce(_) => FragKind::Bounce,
            FragRef::Long(_) => FragKind::Long,
        }
    }

    /// Encode into a user-context word: kind tag in the upper 32 bits, pool
    /// index in the lower 32 bits.
    #[inline(always)]
    pub fn user_ctx(self) -> UserCtx {
        let idx = match self {
            FragRef::Bounce(idx) | FragRef::Long(idx) => idx,
        };
        (self.kind() as u64) << 32 | idx as u64
    }

    /// Decode a user-context word produced by [`FragRef::user_ctx`].
    #[inline(always)]
    pub fn from_user_ctx(ctx: UserCtx) -> Option<Self> {
        let tag = u8::try_from(ctx >> 32).ok()?;
        let idx = ctx as u32;
        match FragKind::from_tag(tag)? {
            FragKind::Bounce => Some(FragRef::Bounce(idx)),
            FragKind::Long => Some(FragRef::Long(idx)),
        }
    }
}

/// Caller-visible completion counter of non-blocking operations.
///
/// The transport increments it once per sub-operation at issue time and
/// decrements it once per sub-operation as completions are drained. One
/// counter may be shared by any number of operations; it reaches zero when
/// all of them have completed locally and their source buffers may be reused.
#[derive(Clone, Default)]
pub struct Completion(Rc<Cell<i64>>);

impl Completion {
    /// Create a counter with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sub-operations still outstanding.
    #[inline]
    pub fn pending(&self) -> i64 {
        self.0.get()
    }

    /// Return `true` if nothing is outstanding.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.pending() <= 0
    }

    #[inline(always)]
    pub(crate) fn incr(&self) {
        self.0.set(self.0.get() + 1);
    }

    #[inline(always)]
    pub(crate) fn decr(&self) {
        self.0.set(self.0.get() - 1);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Completion").field(&self.pending()).finish()
    }
}

/// Records stored in a fragment pool.
pub(crate) trait Fragment {
    /// Kind every record of this type must carry.
    const KIND: FragKind;

    /// Kind tag stored in the record.
    fn kind(&self) -> FragKind;
}

/// A bounce buffer: one slot of the bounce pool's scratch memory.
pub(crate) struct BounceBuffer {
    kind: FragKind,

    /// Start of the slot.
    data: NonNull<u8>,
}

impl BounceBuffer {
    #[inline]
    pub fn new(data: NonNull<u8>) -> Self {
        Self {
            kind: FragKind::Bounce,
            data,
        }
    }

    /// Start address of the slot.
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.data.as_ptr()
    }
}

impl Fragment for BounceBuffer {
    const KIND: FragKind = FragKind::Bounce;

    #[inline(always)]
    fn kind(&self) -> FragKind {
        self.kind
    }
}

/// A long fragment.
pub(crate) struct LongFrag {
    kind: FragKind,

    /// Sub-operations (and issuers) still holding this fragment.
    pub reference: u32,

    /// Counter the owning call reports completions to.
    pub completion: Option<Completion>,
}

impl LongFrag {
    #[inline]
    pub fn new() -> Self {
        Self {
            kind: FragKind::Long,
            reference: 0,
            completion: None,
        }
    }
}

impl Fragment for LongFrag {
    const KIND: FragKind = FragKind::Long;

    #[inline(always)]
    fn kind(&self) -> FragKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ctx_encoding() {
        for frag in [FragRef::Bounce(0), FragRef::Bounce(77), FragRef::Long(u32::MAX)] {
            assert_eq!(FragRef::from_user_ctx(frag.user_ctx()), Some(frag));
        }
        assert_eq!(FragRef::Long(5).user_ctx(), 0x2_0000_0005);
    }

    #[test]
    fn rejects_unknown_tags() {
        assert_eq!(FragRef::from_user_ctx(0), None);
        assert_eq!(FragRef::from_user_ctx(0x3_0000_0000), None);
        assert_eq!(FragRef::from_user_ctx(0x101_0000_0000), None);
    }

    #[test]
    fn completion_is_shared() {
        let c = Completion::new();
        let c2 = c.clone();
        c.incr();
        c2.incr();
        assert_eq!(c.pending(), 2);
        c.decr();
        c.decr();
        assert!(c2.is_complete());
    }
}
