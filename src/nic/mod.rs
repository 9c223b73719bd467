//! The network interface consumed by the transport.
//!
//! The interface exposes RDMA-style one-sided primitives with two completion
//! channels: hardware counters (one for put acknowledgments, one for get
//! replies) and a bounded event queue that reports local completion of
//! operations issued with a user-context tag.

#[cfg(any(test, feature = "loopback"))]
pub mod loopback;

use std::fmt;

use crate::addr::RemoteAccess;
use crate::type_alias::*;

/// Return code of a failed interface call or completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NiError(pub i32);

impl NiError {
    /// Generic failure.
    pub const FAIL: NiError = NiError(1);
    /// Invalid argument.
    pub const ARG_INVALID: NiError = NiError(2);
    /// Out of resources.
    pub const NO_SPACE: NiError = NiError(3);
    /// The event queue overflowed and dropped events.
    pub const EQ_DROPPED: NiError = NiError(4);
    /// The event queue has no event and none can arrive.
    pub const EQ_EMPTY: NiError = NiError(5);
    /// A counter wait can never be satisfied.
    pub const CT_NONE_REACHED: NiError = NiError(6);
}

impl fmt::Display for NiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result type of interface calls.
pub type NiResult<T> = std::result::Result<T, NiError>;

/// Local memory descriptors the transport issues from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemDesc {
    /// Data is consumed at issue time; no completion event is generated.
    PutVolatile,

    /// Data is read asynchronously; a send event is generated on local
    /// completion.
    PutEvent,

    /// Destination of gets and of fetching/swap replies.
    Get,
}

/// Hardware completion counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    /// Counts acknowledged puts and atomics.
    Put,

    /// Counts get, fetching-atomic and swap replies.
    Get,
}

/// Snapshot of a hardware completion counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtEvent {
    /// Operations completed successfully.
    pub success: u64,

    /// Operations completed with failure.
    pub failure: u64,
}

/// Completion event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Local completion of an event-generating send.
    Send,
    /// Remote acknowledgment.
    Ack,
    /// Reply to a get.
    Reply,
    /// Incoming put.
    Put,
    /// Incoming get.
    Get,
    /// Incoming atomic.
    Atomic,
}

/// A completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Event kind.
    pub kind: EventKind,

    /// Failure reported for the operation, if any.
    pub ni_fail: Option<NiError>,

    /// User-context tag the operation was issued with.
    pub user_ctx: Option<UserCtx>,
}

/// Target of a one-sided operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Target peer.
    pub pe: Pe,

    /// Region and offset on the peer.
    pub access: RemoteAccess,
}

/// Arithmetic and logical atomic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicOp {
    Min,
    Max,
    Sum,
    Prod,
    Lor,
    Land,
    Bor,
    Band,
    Lxor,
    Bxor,
}

/// Swap-family operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOp {
    /// Unconditional swap.
    Swap,
    /// Swap if the target equals the operand.
    Cswap,
    /// Swap the bits selected by the operand mask.
    Mswap,
}

/// Element datatypes of atomic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    FloatComplex,
    DoubleComplex,
    LongDouble,
    LongDoubleComplex,
}

impl Datatype {
    /// Largest element of any datatype, in bytes.
    pub const MAX_SIZE: usize = 32;

    /// Element size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Datatype::Int8 | Datatype::Uint8 => 1,
            Datatype::Int16 | Datatype::Uint16 => 2,
            Datatype::Int32 | Datatype::Uint32 | Datatype::Float => 4,
            Datatype::Int64 | Datatype::Uint64 | Datatype::Double | Datatype::FloatComplex => 8,
            Datatype::DoubleComplex | Datatype::LongDouble => 16,
            Datatype::LongDoubleComplex => 32,
        }
    }
}

/// Size limits negotiated with the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NiLimits {
    /// Largest volatile (inline) payload.
    pub max_volatile_size: usize,
    /// Largest single atomic payload.
    pub max_atomic_size: usize,
    /// Largest single fetching-atomic payload.
    pub max_fetch_atomic_size: usize,
    /// Largest completion-event queue.
    pub max_eq_depth: usize,
}

/// Trait for an RDMA-style network interface.
///
/// Issue calls return as soon as the operation is queued. Operations issued
/// from [`MemDesc::PutEvent`] with a user-context tag generate exactly one
/// [`EventKind::Send`] event when the local buffer may be reused. Every put
/// and atomic increments the put counter when acknowledged; gets, fetching
/// atomics and swaps increment the get counter when the reply lands.
pub trait NetworkInterface {
    /// Return the size limits of the interface.
    fn limits(&self) -> NiLimits;

    /// Issue a put of `len` bytes from `src`.
    ///
    /// # Safety
    ///
    /// `[src, src + len)` must be valid for reads. For [`MemDesc::PutEvent`]
    /// it must stay valid and unmodified until the completion event arrives.
    unsafe fn put(
        &mut self,
        md: MemDesc,
        src: *const u8,
        len: usize,
        target: Target,
        user_ctx: Option<UserCtx>,
    ) -> NiResult<()>;

    /// Issue a get of `len` bytes into `dst`.
    ///
    /// # Safety
    ///
    /// `[dst, dst + len)` must be valid for writes until the get counter
    /// reports the reply.
    unsafe fn get(&mut self, dst: *mut u8, len: usize, target: Target) -> NiResult<()>;

    /// Issue a non-fetching atomic of `len` bytes from `src`.
    ///
    /// # Safety
    ///
    /// Same as [`NetworkInterface::put`].
    #[allow(clippy::too_many_arguments)]
    unsafe fn atomic(
        &mut self,
        md: MemDesc,
        src: *const u8,
        len: usize,
        target: Target,
        user_ctx: Option<UserCtx>,
        op: AtomicOp,
        dtype: Datatype,
    ) -> NiResult<()>;

    /// Issue a fetching atomic; the previous target value lands in `dst`.
    ///
    /// # Safety
    ///
    /// `src` is consumed at issue time; `[dst, dst + len)` must be valid for
    /// writes until the get counter reports the reply.
    unsafe fn fetch_atomic(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        len: usize,
        target: Target,
        op: AtomicOp,
        dtype: Datatype,
    ) -> NiResult<()>;

    /// Issue a swap-family operation; the previous target value lands in
    /// `dst`. `operand` is the comparand ([`SwapOp::Cswap`]) or the mask
    /// ([`SwapOp::Mswap`]).
    ///
    /// # Safety
    ///
    /// Same as [`NetworkInterface::fetch_atomic`]; `operand`, if given, must
    /// be valid for reads of `len` bytes at issue time.
    #[allow(clippy::too_many_arguments)]
    unsafe fn swap(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        len: usize,
        target: Target,
        operand: Option<*const u8>,
        op: SwapOp,
        dtype: Datatype,
    ) -> NiResult<()>;

    /// Block until `success + failure` of the counter reaches `test`.
    fn ct_wait(&mut self, counter: CounterKind, test: SeqNum) -> NiResult<CtEvent>;

    /// Block until the next completion event.
    fn eq_wait(&mut self) -> NiResult<Event>;
}
