//! Corner cases: addressing, failures, configuration.

use super::*;

#[test]
fn outside_symmetric_regions() {
    let mut fx = Fixture::new(test_config());
    let local = [0u8; 16];
    let addr = local.as_ptr();

    assert_eq!(
        fx.tp.put_small(addr, &[1], PEER),
        Err(Error::OutsideSymmetric { addr: addr as usize })
    );
    assert!(fx.tp.nic().calls().is_empty());
    assert_eq!(fx.tp.stats().pending_put, 0);
}

#[test]
fn zero_length_put() {
    let mut fx = Fixture::new(test_config());
    let c = Completion::new();
    let dst = fx.heap(0);
    unsafe { fx.tp.put_nb(dst, &[], PEER, &c) }.unwrap();

    assert_eq!(fx.tp.nic().calls()[0].md, Some(MemDesc::PutVolatile));
    assert_eq!(fx.tp.stats().pending_put, 1);
    fx.tp.quiet().unwrap();
}

#[test]
fn unchecked_addressing() {
    let mut fx = Fixture::new(test_config().with_addr_mode(AddrMode::Unchecked));
    let (d, h) = (fx.data(40), fx.heap(40));

    fx.tp.put_small(d, b"data", PEER).unwrap();
    fx.tp.put_small(h, b"heap", PEER).unwrap();

    assert_eq!(&fx.peer(RegionId::Data)[40..44], b"data");
    assert_eq!(&fx.peer(RegionId::Heap)[40..44], b"heap");
}

#[test]
fn interface_call_failure() {
    let mut fx = Fixture::new(test_config());
    let dst = fx.heap(0);
    fx.tp.nic_mut().fail_next_call(NiError::NO_SPACE);

    let err = fx.tp.put_small(dst, &[1, 2], PEER).unwrap_err();
    assert_eq!(
        err,
        Error::Interface {
            op: "put",
            code: NiError::NO_SPACE
        }
    );
    assert!(err.is_hardware());
    assert_eq!(fx.tp.stats().pending_put, 0);
}

/// A rejected issue call gives back everything it reserved, on every tier.
#[test]
fn failed_issue_returns_resources() {
    let mut fx = Fixture::new(test_config());
    let c = Completion::new();
    let dst = fx.heap(0);
    let baseline = fx.tp.stats();

    for len in [8, 1000, 10_000] {
        let src = pattern(len, 3);
        fx.tp.nic_mut().fail_next_call(NiError::NO_SPACE);
        let ret = unsafe { fx.tp.put_nb(dst, &src, PEER, &c) };
        assert_eq!(
            ret,
            Err(Error::Interface {
                op: "put",
                code: NiError::NO_SPACE
            }),
            "{} byte put",
            len
        );
        assert_eq!(fx.tp.stats(), baseline, "{} byte put", len);
        assert_eq!(c.pending(), 0);
    }

    for len in [16, 400, 2048] {
        let src = words(&vec![1; len / 8]);
        fx.tp.nic_mut().fail_next_call(NiError::NO_SPACE);
        let ret = unsafe { fx.tp.atomic_nb(dst, &src, PEER, AtomicOp::Sum, Datatype::Uint64, &c) };
        assert!(matches!(ret, Err(Error::Interface { op: "atomic", .. })), "{} byte atomic", len);
        assert_eq!(fx.tp.stats(), baseline, "{} byte atomic", len);
        assert_eq!(c.pending(), 0);
    }

    // Nothing is left behind for teardown to wait on.
    assert!(fx.tp.nic().calls().is_empty());
    fx.tp.put_wait(&c).unwrap();
    fx.tp.quiet().unwrap();
}

#[test]
fn completion_event_failure() {
    let mut fx = Fixture::new(test_config());
    let c = Completion::new();
    let dst = fx.heap(0);
    let src = pattern(1000, 0);
    fx.tp.nic_mut().fail_next_event(NiError::FAIL);

    unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
    assert_eq!(fx.tp.drain_eq(), Err(Error::EventFailure { code: NiError::FAIL }));
}

#[test]
fn put_counter_failure() {
    let mut fx = Fixture::new(test_config());
    let dst = fx.heap(0);
    fx.tp.put_small(dst, &[1], PEER).unwrap();
    fx.tp.nic_mut().fail_counter(CounterKind::Put, 2);

    assert_eq!(
        fx.tp.quiet(),
        Err(Error::CounterFailure {
            counter: CounterKind::Put,
            failures: 2
        })
    );
}

#[test]
#[should_panic(expected = "unexpected completion event")]
fn foreign_event_kind_traps() {
    struct Reply(LoopbackNic);

    impl NetworkInterface for Reply {
        fn limits(&self) -> NiLimits {
            self.0.limits()
        }
        unsafe fn put(
            &mut self,
            md: MemDesc,
            src: *const u8,
            len: usize,
            target: Target,
            user_ctx: Option<UserCtx>,
        ) -> NiResult<()> {
            self.0.put(md, src, len, target, user_ctx)
        }
        unsafe fn get(&mut self, dst: *mut u8, len: usize, target: Target) -> NiResult<()> {
            self.0.get(dst, len, target)
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
            self.0.atomic(md, src, len, target, user_ctx, op, dtype)
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
            self.0.fetch_atomic(dst, src, len, target, op, dtype)
        }
        unsafe fn swap(
            &mut self,
            dst: *mut u8,
            src: *const u8,
            len: usize,
            target: Target,
            operand: Option<*const u8>,
            op: SwapOp,
            dtype: Datatype,
        ) -> NiResult<()> {
            self.0.swap(dst, src, len, target, operand, op, dtype)
        }
        fn ct_wait(&mut self, counter: CounterKind, test: SeqNum) -> NiResult<CtEvent> {
            self.0.ct_wait(counter, test)
        }
        fn eq_wait(&mut self) -> NiResult<Event> {
            let mut ev = self.0.eq_wait()?;
            ev.kind = EventKind::Reply;
            Ok(ev)
        }
    }

    init_logger();
    let mem = vec![0u8; DATA_LEN + HEAP_LEN];
    let data = SymmetricRegion::from_slice(&mem[..DATA_LEN]);
    let heap = SymmetricRegion::from_slice(&mem[DATA_LEN..]);
    let nic = Reply(LoopbackNic::new(PES, DATA_LEN, HEAP_LEN, 8));
    let mut tp = Transport::new(nic, test_config(), data, heap).unwrap();

    let c = Completion::new();
    let src = pattern(1000, 0);
    unsafe { tp.put_nb(mem[DATA_LEN..].as_ptr(), &src, PEER, &c) }.unwrap();
    let _ = tp.drain_eq();
}

/// Limits the interface cannot honor are clamped.
#[test]
fn config_clamped_to_interface() {
    let nic = LoopbackNic::new(PES, DATA_LEN, HEAP_LEN, 8).with_limits(NiLimits {
        max_volatile_size: 32,
        max_atomic_size: 128,
        max_fetch_atomic_size: 8,
        max_eq_depth: 8,
    });
    let mut fx = Fixture::with_nic(nic, test_config().with_event_queue_depth(1024));

    let cfg = fx.tp.config().clone();
    assert_eq!(cfg.max_volatile_size, 32);
    assert_eq!(cfg.max_atomic_size, 128);
    assert_eq!(cfg.max_fetch_atomic_size, 8);
    assert_eq!(cfg.event_queue_depth, 8);
    assert_eq!(fx.tp.stats().event_slots, 8);

    // 64 bytes is now a bounce put; 256 bytes a two-chunk atomic.
    let c = Completion::new();
    let dst = fx.heap(0);
    unsafe { fx.tp.put_nb(dst, &[0; 64], PEER, &c) }.unwrap();
    assert_eq!(fx.tp.stats().bounce_available, 15);
    unsafe { fx.tp.atomic_nb(dst, &[0; 256], PEER, AtomicOp::Sum, Datatype::Uint64, &c) }.unwrap();
    assert_eq!(c.pending(), 2);
}

#[test]
fn invalid_config_rejected() {
    init_logger();
    let mem = vec![0u8; DATA_LEN + HEAP_LEN];
    let data = SymmetricRegion::from_slice(&mem[..DATA_LEN]);
    let heap = SymmetricRegion::from_slice(&mem[DATA_LEN..]);

    let nic = LoopbackNic::new(PES, DATA_LEN, HEAP_LEN, 8);
    let ret = Transport::new(nic, test_config().with_long_frags(0), data, heap);
    assert!(matches!(ret, Err(Error::InvalidConfig(_))));

    // Clamping must not produce an unusable queue either.
    let nic = LoopbackNic::new(PES, DATA_LEN, HEAP_LEN, 8).with_limits(NiLimits {
        max_eq_depth: 1,
        ..LoopbackNic::DEFAULT_LIMITS
    });
    let ret = Transport::new(nic, test_config(), data, heap);
    assert!(matches!(ret, Err(Error::InvalidConfig(_))));

    let nic = LoopbackNic::new(PES, DATA_LEN, HEAP_LEN, 8);
    let ret = Transport::new(nic, test_config(), data, data);
    assert!(matches!(ret, Err(Error::InvalidConfig(_))));
}

/// A configuration shipped in MessagePack form drives a working transport.
#[test]
fn config_from_msgpack() {
    let shipped = test_config().with_bounce_buffers(4);
    let bytes = rmp_serde::to_vec_named(&shipped).unwrap();
    let cfg: TransportConfig = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(cfg, shipped);

    let mut fx = Fixture::new(cfg);
    assert_eq!(fx.tp.stats().bounce_capacity, 4);
    let dst = fx.heap(0);
    fx.tp.put_small(dst, &[9; 4], PEER).unwrap();
    fx.tp.quiet().unwrap();
}

/// Independent transports keep independent accounting.
#[test]
fn independent_transports() {
    let mut a = Fixture::new(test_config());
    let mut b = Fixture::new(test_config());
    let c = Completion::new();

    let (da, db) = (a.heap(0), b.heap(0));
    unsafe { a.tp.put_nb(da, &pattern(2000, 1), PEER, &c) }.unwrap();
    b.tp.put_small(db, &[1], PEER).unwrap();

    assert_eq!(a.tp.stats().outstanding_events, 1);
    assert_eq!(b.tp.stats().outstanding_events, 0);
    assert_eq!(a.tp.stats().bounce_available, 15);
    assert_eq!(b.tp.stats().bounce_available, 16);
}
