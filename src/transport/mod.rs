//! The one-sided transport.
//!
//! [`Transport`] multiplexes asynchronous put/get/atomic operations of any
//! size onto two fixed pools of fragments and the network interface's bounded
//! event queue. Small payloads are issued inline, mid-sized ones are copied
//! into bounce buffers, and large ones are sent straight from the caller's
//! buffer and tracked by long fragments and a caller-supplied
//! [`Completion`](crate::Completion) counter.

mod atomic;
mod drain;
mod get;
mod put;
mod wait;

use std::thread::{self, ThreadId};

use crate::addr::{AddrTranslator, SymmetricRegion};
use crate::config::TransportConfig;
use crate::error::{Error, PoolKind, Result};
use crate::flow::EventSlots;
use crate::nic::{NetworkInterface, NiError, Target};
use crate::pool::{BouncePool, LongFragPool};
use crate::type_alias::*;
use crate::util::likely::*;

/// Snapshot of the transport's resource usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStats {
    /// Free bounce buffers.
    pub bounce_available: usize,
    /// Total bounce buffers.
    pub bounce_capacity: usize,
    /// Free long fragments.
    pub long_available: usize,
    /// Total long fragments.
    pub long_capacity: usize,
    /// Completion events issued but not yet drained.
    pub outstanding_events: usize,
    /// Event slots currently available.
    pub event_slots: i32,
    /// Puts and atomics issued so far.
    pub pending_put: SeqNum,
    /// Gets, fetching atomics and swaps issued so far.
    pub pending_get: SeqNum,
}

/// One-sided transport over a network interface.
///
/// A transport is driven by a single thread: every operation takes
/// `&mut self`, and the transport panics if used on a thread other than the
/// one that created it (unless the `no_thread_checks` feature is enabled).
pub struct Transport<N: NetworkInterface> {
    /// The network interface.
    nic: N,

    /// Effective configuration, clamped to the interface limits.
    config: TransportConfig,

    /// Symmetric address translation.
    translator: AddrTranslator,

    /// Bounce buffers for eager puts and atomics.
    bounce: BouncePool,

    /// Long fragments for zero-copy and multi-part operations.
    long_frags: LongFragPool,

    /// Event-queue admission gate.
    slots: EventSlots,

    /// Puts and atomics issued, the target of `quiet`.
    pending_put: SeqNum,

    /// Gets and get-channel replies issued, the target of `get_wait`.
    pending_get: SeqNum,

    /// Thread that created this transport.
    thread_id: ThreadId,
}

impl<N: NetworkInterface> Transport<N> {
    /// Create a transport over the given interface and symmetric regions.
    ///
    /// The configured size limits are clamped to [`NetworkInterface::limits`]
    /// and both pools are populated.
    pub fn new(
        nic: N,
        config: TransportConfig,
        data: SymmetricRegion,
        heap: SymmetricRegion,
    ) -> Result<Self> {
        config.validate()?;
        let config = config.clamp_to(&nic.limits());
        config.validate()?;

        let translator = AddrTranslator::new(data, heap, config.addr_mode)?;
        let bounce = BouncePool::new(config.bounce_buffers, config.bounce_buffer_size)?;
        let long_frags = LongFragPool::new(config.long_frags);
        let slots = EventSlots::new(config.event_queue_depth);

        log::debug!(
            "transport: {} x {}B bounce buffers, {} long fragments, {} event slots, data {:?}, heap {:?}",
            config.bounce_buffers,
            config.bounce_buffer_size,
            config.long_frags,
            config.event_queue_depth,
            data,
            heap
        );

        Ok(Self {
            nic,
            config,
            translator,
            bounce,
            long_frags,
            slots,
            pending_put: 0,
            pending_get: 0,
            thread_id: thread::current().id(),
        })
    }

    /// Return the effective configuration.
    #[inline]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Return the network interface.
    #[inline]
    pub fn nic(&self) -> &N {
        &self.nic
    }

    /// Return the network interface mutably.
    ///
    /// Issuing operations directly on the interface bypasses the transport's
    /// accounting.
    #[inline]
    pub fn nic_mut(&mut self) -> &mut N {
        &mut self.nic
    }

    /// Return a snapshot of resource usage.
    pub fn stats(&self) -> TransportStats {
        TransportStats {
            bounce_available: self.bounce.available(),
            bounce_capacity: self.bounce.capacity(),
            long_available: self.long_frags.available(),
            long_capacity: self.long_frags.capacity(),
            outstanding_events: self.slots.outstanding(),
            event_slots: self.slots.available(),
            pending_put: self.pending_put,
            pending_get: self.pending_get,
        }
    }

    /// Tear the transport down.
    ///
    /// Drain every outstanding completion, returning all fragments to their
    /// pools, then wait for all puts to be acknowledged and all gets to land.
    /// Return the network interface.
    pub fn fini(mut self) -> Result<N> {
        crate::util::thread_check::do_thread_check(self.thread_id);
        while self.slots.outstanding() > 0 {
            self.drain_eq()?;
        }
        self.quiet()?;
        self.get_wait()?;

        debug_assert_eq!(self.bounce.available(), self.bounce.capacity());
        debug_assert_eq!(self.long_frags.available(), self.long_frags.capacity());
        log::debug!(
            "transport: finalized after {} puts and {} gets",
            self.pending_put,
            self.pending_get
        );
        Ok(self.nic)
    }
}

/// Internal helpers shared by the operation families.
impl<N: NetworkInterface> Transport<N> {
    /// Translate a local symmetric address into a target on peer `pe`.
    #[inline]
    fn target(&self, addr: *const u8, pe: Pe) -> Result<Target> {
        crate::util::thread_check::do_thread_check(self.thread_id);
        let access = self.translator.translate(addr as usize)?;
        Ok(Target { pe, access })
    }

    /// Take a bounce buffer holding a copy of `data`, draining completions
    /// while the pool is empty. The caller already holds one event slot.
    fn alloc_bounce(&mut self, data: &[u8]) -> Result<(u32, *const u8)> {
        loop {
            if let Some(buf) = self.bounce.alloc_copy(data) {
                return Ok(buf);
            }
            if unlikely(self.slots.outstanding() <= 1) {
                return Err(Error::PoolExhausted(PoolKind::Bounce));
            }
            log::warn!("transport: bounce buffer pool empty, draining a completion");
            self.drain_eq()?;
        }
    }

    /// Take a long fragment, draining completions while the pool is empty.
    /// `reserved` is the number of event slots the caller already holds.
    fn alloc_long(&mut self, reserved: usize) -> Result<u32> {
        loop {
            if let Some(idx) = self.long_frags.alloc() {
                debug_assert_eq!(self.long_frags.get(idx).reference, 0);
                return Ok(idx);
            }
            if unlikely(self.slots.outstanding() <= reserved) {
                return Err(Error::PoolExhausted(PoolKind::Long));
            }
            log::warn!("transport: long fragment pool empty, draining a completion");
            self.drain_eq()?;
        }
    }
}

/// Map an interface return code to a transport error.
#[inline(always)]
fn ni_err(op: &'static str) -> impl FnOnce(NiError) -> Error {
    move |code| Error::Interface { op, code }
}
