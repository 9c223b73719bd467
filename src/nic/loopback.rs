//! In-process network interface.
//!
//! Every peer's symmetric regions are simulated as plain byte vectors and
//! every operation completes at issue time: counters advance immediately and
//! completion events are queued in a bounded queue of the configured depth.
//! A queue overflow is remembered and reported by the next [`eq_wait`], the
//! same way hardware reports dropped events.
//!
//! [`eq_wait`]: NetworkInterface::eq_wait

use std::slice;

use crossbeam::queue::ArrayQueue;

use super::*;
use crate::addr::RegionId;

/// Kind of an issued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Put,
    Get,
    Atomic(AtomicOp),
    FetchAtomic(AtomicOp),
    Swap(SwapOp),
}

/// Record of an issued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedOp {
    /// Operation kind.
    pub kind: OpKind,

    /// Source memory descriptor (puts and atomics only).
    pub md: Option<MemDesc>,

    /// Target of the operation.
    pub target: Target,

    /// Payload length.
    pub len: usize,

    /// User-context tag.
    pub user_ctx: Option<UserCtx>,
}

/// Simulated symmetric memory of one peer.
struct PeerMemory {
    data: Vec<u8>,
    heap: Vec<u8>,
}

impl PeerMemory {
    fn region(&self, region: RegionId) -> &[u8] {
        match region {
            RegionId::Data => &self.data,
            RegionId::Heap => &self.heap,
        }
    }

    fn region_mut(&mut self, region: RegionId) -> &mut [u8] {
        match region {
            RegionId::Data => &mut self.data,
            RegionId::Heap => &mut self.heap,
        }
    }
}

/// Loopback network interface.
pub struct LoopbackNic {
    limits: NiLimits,
    peers: Vec<PeerMemory>,

    eq: ArrayQueue<Event>,
    eq_dropped: bool,
    eq_high_water: usize,

    put_ct: CtEvent,
    get_ct: CtEvent,

    calls: Vec<IssuedOp>,
    /// Issue calls to let through, and the code the one after them fails with.
    fail_call: Option<(usize, NiError)>,
    fail_next_event: Option<NiError>,
}

impl LoopbackNic {
    /// Default interface limits.
    pub const DEFAULT_LIMITS: NiLimits = NiLimits {
        max_volatile_size: 256,
        max_atomic_size: 512,
        max_fetch_atomic_size: 32,
        max_eq_depth: 1 << 16,
    };

    /// Create an interface connecting `pes` peers, each exposing a data
    /// region of `data_len` bytes and a heap of `heap_len` bytes.
    pub fn new(pes: usize, data_len: usize, heap_len: usize, eq_depth: usize) -> Self {
        assert!(eq_depth > 0, "event queue depth cannot be 0");
        let peers = (0..pes)
            .map(|_| PeerMemory {
                data: vec![0; data_len],
                heap: vec![0; heap_len],
            })
            .collect();
        Self {
            limits: Self::DEFAULT_LIMITS,
            peers,
            eq: ArrayQueue::new(eq_depth),
            eq_dropped: false,
            eq_high_water: 0,
            put_ct: CtEvent::default(),
            get_ct: CtEvent::default(),
            calls: Vec::new(),
            fail_call: None,
            fail_next_event: None,
        }
    }

    /// Override the reported interface limits.
    pub fn with_limits(mut self, limits: NiLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Simulated memory of a peer's region.
    pub fn peer_mem(&self, pe: Pe, region: RegionId) -> &[u8] {
        self.peers[pe as usize].region(region)
    }

    /// Mutable simulated memory of a peer's region.
    pub fn peer_mem_mut(&mut self, pe: Pe, region: RegionId) -> &mut [u8] {
        self.peers[pe as usize].region_mut(region)
    }

    /// Operations issued so far.
    pub fn calls(&self) -> &[IssuedOp] {
        &self.calls
    }

    /// Forget the recorded operations.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of events currently queued.
    pub fn queued_events(&self) -> usize {
        self.eq.len()
    }

    /// Largest number of events ever queued at once.
    pub fn eq_high_water(&self) -> usize {
        self.eq_high_water
    }

    /// Return `true` if the event queue ever overflowed.
    pub fn eq_dropped(&self) -> bool {
        self.eq_dropped
    }

    /// Current value of a hardware counter.
    pub fn counter(&self, counter: CounterKind) -> CtEvent {
        match counter {
            CounterKind::Put => self.put_ct,
            CounterKind::Get => self.get_ct,
        }
    }

    /// Make the next issue call fail with `code` without side effects.
    pub fn fail_next_call(&mut self, code: NiError) {
        self.fail_nth_call(0, code);
    }

    /// Let `skip` issue calls through, then fail the next one with `code`.
    pub fn fail_nth_call(&mut self, skip: usize, code: NiError) {
        self.fail_call = Some((skip, code));
    }

    /// Make the next generated event carry failure `code`.
    pub fn fail_next_event(&mut self, code: NiError) {
        self.fail_next_event = Some(code);
    }

    /// Record `n` failed operations on a counter.
    pub fn fail_counter(&mut self, counter: CounterKind, n: u64) {
        match counter {
            CounterKind::Put => self.put_ct.failure += n,
            CounterKind::Get => self.get_ct.failure += n,
        }
    }
}

impl LoopbackNic {
    fn check_injected_failure(&mut self) -> NiResult<()> {
        match self.fail_call.take() {
            Some((0, code)) => Err(code),
            Some((skip, code)) => {
                self.fail_call = Some((skip - 1, code));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn target_range(&self, target: &Target, len: usize) -> NiResult<std::ops::Range<usize>> {
        let peer = self
            .peers
            .get(target.pe as usize)
            .ok_or(NiError::ARG_INVALID)?;
        let start = target.access.offset;
        let end = start.checked_add(len).ok_or(NiError::ARG_INVALID)?;
        if end > peer.region(target.access.region).len() {
            return Err(NiError::ARG_INVALID);
        }
        Ok(start..end)
    }

    fn target_mem(&mut self, target: &Target, len: usize) -> NiResult<&mut [u8]> {
        let range = self.target_range(target, len)?;
        Ok(&mut self.peers[target.pe as usize].region_mut(target.access.region)[range])
    }

    fn push_event(&mut self, user_ctx: UserCtx) {
        let ev = Event {
            kind: EventKind::Send,
            ni_fail: self.fail_next_event.take(),
            user_ctx: Some(user_ctx),
        };
        if self.eq.push(ev).is_err() {
            log::warn!("loopback: event queue overflow, dropping event {:#x}", user_ctx);
            self.eq_dropped = true;
        }
        self.eq_high_water = self.eq_high_water.max(self.eq.len());
    }

    fn complete_put(&mut self, md: MemDesc, user_ctx: Option<UserCtx>) {
        self.put_ct.success += 1;
        if md == MemDesc::PutEvent {
            if let Some(ctx) = user_ctx {
                self.push_event(ctx);
            }
        }
    }
}

impl NetworkInterface for LoopbackNic {
    fn limits(&self) -> NiLimits {
        self.limits
    }

    unsafe fn put(
        &mut self,
        md: MemDesc,
        src: *const u8,
        len: usize,
        target: Target,
        user_ctx: Option<UserCtx>,
    ) -> NiResult<()> {
        self.check_injected_failure()?;
        if md == MemDesc::Get || (md == MemDesc::PutVolatile && len > self.limits.max_volatile_size) {
            return Err(NiError::ARG_INVALID);
        }

        // SAFETY: the caller guarantees `[src, src + len)` is readable.
        let src = unsafe { slice::from_raw_parts(src, len) };
        self.target_mem(&target, len)?.copy_from_slice(src);

        self.calls.push(IssuedOp {
            kind: OpKind::Put,
            md: Some(md),
            target,
            len,
            user_ctx,
        });
        self.complete_put(md, user_ctx);
        Ok(())
    }

    unsafe fn get(&mut self, dst: *mut u8, len: usize, target: Target) -> NiResult<()> {
        self.check_injected_failure()?;
        let range = self.target_range(&target, len)?;
        let src = &self.peers[target.pe as usize].region(target.access.region)[range];

        // SAFETY: the caller guarantees `[dst, dst + len)` is writable.
        unsafe { slice::from_raw_parts_mut(dst, len) }.copy_from_slice(src);

        self.calls.push(IssuedOp {
            kind: OpKind::Get,
            md: None,
            target,
            len,
            user_ctx: None,
        });
        self.get_ct.success += 1;
        Ok(())
    }

    unsafe fn atomic(
        &mut self,
        md: MemDesc,
        src: *const u8,
        len: usize,
        target: Target,
        user_ctx: Option<UserCtx>,
        op: AtomicOp,
        dtype: Datatype,
    ) -> NiResult<()> {
        self.check_injected_failure()?;
        if md == MemDesc::Get || len > self.limits.max_atomic_size {
            return Err(NiError::ARG_INVALID);
        }

        // SAFETY: the caller guarantees `[src, src + len)` is readable.
        let src = unsafe { slice::from_raw_parts(src, len) };
        apply_atomic(op, dtype, self.target_mem(&target, len)?, src)?;

        self.calls.push(IssuedOp {
            kind: OpKind::Atomic(op),
            md: Some(md),
            target,
            len,
            user_ctx,
        });
        self.complete_put(md, user_ctx);
        Ok(())
    }

    unsafe fn fetch_atomic(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        len: usize,
        target: Target,
        op: AtomicOp,
        dtype: Datatype,
    ) -> NiResult<()> {
        self.check_injected_failure()?;
        if len > self.limits.max_fetch_atomic_size {
            return Err(NiError::ARG_INVALID);
        }

        // SAFETY: the caller guarantees both ranges are valid.
        let (src, dst) = unsafe {
            (
                slice::from_raw_parts(src, len),
                slice::from_raw_parts_mut(dst, len),
            )
        };
        let mem = self.target_mem(&target, len)?;
        dst.copy_from_slice(mem);
        apply_atomic(op, dtype, mem, src)?;

        self.calls.push(IssuedOp {
            kind: OpKind::FetchAtomic(op),
            md: None,
            target,
            len,
            user_ctx: None,
        });
        self.get_ct.success += 1;
        Ok(())
    }

    unsafe fn swap(
        &mut self,
        dst: *mut u8,
        src: *const u8,
        len: usize,
        target: Target,
        operand: Option<*const u8>,
        op: SwapOp,
        _dtype: Datatype,
    ) -> NiResult<()> {
        self.check_injected_failure()?;
        if len > Datatype::MAX_SIZE || (op != SwapOp::Swap && operand.is_none()) {
            return Err(NiError::ARG_INVALID);
        }

        // SAFETY: the caller guarantees all ranges are valid.
        let (src, dst, operand) = unsafe {
            (
                slice::from_raw_parts(src, len),
                slice::from_raw_parts_mut(dst, len),
                operand.map(|p| slice::from_raw_parts(p, len)),
            )
        };
        let mem = self.target_mem(&target, len)?;
        dst.copy_from_slice(mem);
        match (op, operand) {
            (SwapOp::Swap, _) => mem.copy_from_slice(src),
            (SwapOp::Cswap, Some(cmp)) => {
                if mem == cmp {
                    mem.copy_from_slice(src);
                }
            }
            (SwapOp::Mswap, Some(mask)) => {
                for ((m, s), k) in mem.iter_mut().zip(src).zip(mask) {
                    *m = (*m & !k) | (s & k);
                }
            }
            _ => unreachable!(),
        }

        self.calls.push(IssuedOp {
            kind: OpKind::Swap(op),
            md: None,
            target,
            len,
            user_ctx: None,
        });
        self.get_ct.success += 1;
        Ok(())
    }

    fn ct_wait(&mut self, counter: CounterKind, test: SeqNum) -> NiResult<CtEvent> {
        let ct = self.counter(counter);
        // Everything completes at issue time, so an unreached value would
        // block forever.
        if ct.success + ct.failure >= test {
            Ok(ct)
        } else {
            Err(NiError::CT_NONE_REACHED)
        }
    }

    fn eq_wait(&mut self) -> NiResult<Event> {
        if self.eq_dropped {
            return Err(NiError::EQ_DROPPED);
        }
        self.eq.pop().ok_or(NiError::EQ_EMPTY)
    }
}

/// Element types the loopback can combine.
trait Element: Copy + PartialOrd {
    const SIZE: usize;

    fn load(b: &[u8]) -> Self;
    fn store(self, b: &mut [u8]);
    fn combine(op: AtomicOp, a: Self, b: Self) -> Option<Self>;
}

macro_rules! impl_int_element {
    ($($ty:ty),*) => {$(
        impl Element for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn load(b: &[u8]) -> Self {
                <$ty>::from_ne_bytes(b.try_into().expect("element size mismatch"))
            }

            fn store(self, b: &mut [u8]) {
                b.copy_from_slice(&self.to_ne_bytes());
            }

            fn combine(op: AtomicOp, a: Self, b: Self) -> Option<Self> {
                Some(match op {
                    AtomicOp::Min => a.min(b),
                    AtomicOp::Max => a.max(b),
                    AtomicOp::Sum => a.wrapping_add(b),
                    AtomicOp::Prod => a.wrapping_mul(b),
                    AtomicOp::Lor => ((a != 0) || (b != 0)) as $ty,
                    AtomicOp::Land => ((a != 0) && (b != 0)) as $ty,
                    AtomicOp::Lxor => ((a != 0) ^ (b != 0)) as $ty,
                    AtomicOp::Bor => a | b,
                    AtomicOp::Band => a & b,
                    AtomicOp::Bxor => a ^ b,
                })
            }
        }
    )*};
}

macro_rules! impl_float_element {
    ($($ty:ty),*) => {$(
        impl Element for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn load(b: &[u8]) -> Self {
                <$ty>::from_ne_bytes(b.try_into().expect("element size mismatch"))
            }

            fn store(self, b: &mut [u8]) {
                b.copy_from_slice(&self.to_ne_bytes());
            }

            fn combine(op: AtomicOp, a: Self, b: Self) -> Option<Self> {
                match op {
                    AtomicOp::Min => Some(a.min(b)),
                    AtomicOp::Max => Some(a.max(b)),
                    AtomicOp::Sum => Some(a + b),
                    AtomicOp::Prod => Some(a * b),
                    _ => None,
                }
            }
        }
    )*};
}

impl_int_element!(i8, u8, i16, u16, i32, u32, i64, u64);
impl_float_element!(f32, f64);

fn combine_all<T: Element>(op: AtomicOp, mem: &mut [u8], src: &[u8]) -> NiResult<()> {
    if mem.len() % T::SIZE != 0 {
        return Err(NiError::ARG_INVALID);
    }
    for (m, s) in mem.chunks_exact_mut(T::SIZE).zip(src.chunks_exact(T::SIZE)) {
        let v = T::combine(op, T::load(m), T::load(s)).ok_or(NiError::ARG_INVALID)?;
        v.store(m);
    }
    Ok(())
}

fn apply_atomic(op: AtomicOp, dtype: Datatype, mem: &mut [u8], src: &[u8]) -> NiResult<()> {
    match dtype {
        Datatype::Int8 => combine_all::<i8>(op, mem, src),
        Datatype::Uint8 => combine_all::<u8>(op, mem, src),
        Datatype::Int16 => combine_all::<i16>(op, mem, src),
        Datatype::Uint16 => combine_all::<u16>(op, mem, src),
        Datatype::Int32 => combine_all::<i32>(op, mem, src),
        Datatype::Uint32 => combine_all::<u32>(op, mem, src),
        Datatype::Int64 => combine_all::<i64>(op, mem, src),
        Datatype::Uint64 => combine_all::<u64>(op, mem, src),
        Datatype::Float => combine_all::<f32>(op, mem, src),
        Datatype::Double => combine_all::<f64>(op, mem, src),
        _ => Err(NiError::ARG_INVALID),
    }
}
