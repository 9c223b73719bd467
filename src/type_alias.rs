//! Type aliases used in this library.

/// [`u32`]: Processing element (peer process) identifier.
pub type Pe = u32;

/// [`u64`]: Logical sequence value of the pending-put and pending-get counters.
/// Note that this is a monotonically increasing issue count, not a live count
/// of outstanding operations.
pub type SeqNum = u64;

/// [`u64`]: User-context word attached to event-generating operations and
/// handed back verbatim in the matching completion event.
pub type UserCtx = u64;
