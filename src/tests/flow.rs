//! Event-queue flow control and pool exhaustion.

use super::*;

/// Never more than `depth - 1` events are outstanding, no matter how many
/// event-generating operations are issued without an explicit drain.
#[test]
fn event_queue_never_overflows() {
    let mut fx = Fixture::new(test_config().with_event_queue_depth(4));
    let c = Completion::new();
    let src = pattern(1024, 7);
    let big = pattern(16_384, 8);

    for i in 0..100 {
        let dst = fx.heap((i % 16) * 16_384);
        if i % 3 == 0 {
            unsafe { fx.tp.put_nb(dst, &big, PEER, &c) }.unwrap();
        } else {
            unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
        }
        let stats = fx.tp.stats();
        assert!(stats.event_slots > 0);
        assert!(stats.outstanding_events <= 3);
    }

    let nic = fx.tp.nic();
    assert!(!nic.eq_dropped());
    assert_eq!(nic.eq_high_water(), 3);
}

/// Once every slot is taken, the next issue drains exactly one completion.
#[test]
fn slot_exhaustion_drains_one() {
    let mut fx = Fixture::new(test_config().with_event_queue_depth(4));
    let c = Completion::new();
    let src = pattern(1024, 1);
    let dst = fx.heap(0);

    for _ in 0..3 {
        unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
    }
    assert_eq!(fx.tp.nic().queued_events(), 3);
    assert_eq!(fx.tp.stats().event_slots, 1);

    unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
    assert_eq!(fx.tp.nic().queued_events(), 3);
    assert_eq!(fx.tp.stats().outstanding_events, 3);
    assert_eq!(fx.tp.stats().bounce_available, 13);
}

/// A bounce pool smaller than the event queue is refilled by draining.
#[test]
fn bounce_pool_exhaustion_drains() {
    let mut fx = Fixture::new(test_config().with_bounce_buffers(2).with_event_queue_depth(64));
    let c = Completion::new();
    let dst = fx.heap(0);

    for i in 0..10 {
        let src = pattern(1000, i);
        unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
        assert_eq!(&fx.peer(RegionId::Heap)[..1000], &src[..]);
    }
    let stats = fx.tp.stats();
    assert_eq!(stats.outstanding_events, 2);
    assert_eq!(stats.bounce_available, 0);
    assert_eq!(fx.tp.nic().eq_high_water(), 2);
}

/// Same for long fragments.
#[test]
fn long_pool_exhaustion_drains() {
    let mut fx = Fixture::new(test_config().with_long_frags(1).with_event_queue_depth(64));
    let c = Completion::new();
    let dst = fx.heap(0);
    let src = pattern(10_000, 3);

    for _ in 0..5 {
        unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
        assert_eq!(c.pending(), 1);
    }
    fx.tp.put_wait(&c).unwrap();
    assert_eq!(fx.tp.stats().long_available, 1);
}

/// A chunked atomic needs only one long fragment, however many chunks.
#[test]
fn chunked_atomic_with_one_long_frag() {
    let mut fx = Fixture::new(test_config().with_long_frags(1).with_event_queue_depth(4));
    let c = Completion::new();
    let dst = fx.heap(0);
    let src = words(&[1; 1024]);

    for _ in 0..3 {
        unsafe { fx.tp.atomic_nb(dst, &src, PEER, AtomicOp::Sum, Datatype::Uint64, &c) }.unwrap();
    }
    fx.tp.put_wait(&c).unwrap();

    assert_eq!(fx.tp.nic().calls().len(), 48);
    assert_eq!(read_words(&fx.peer(RegionId::Heap)[..8192]), vec![3; 1024]);
    assert!(!fx.tp.nic().eq_dropped());
}

/// Teardown drains everything and hands the interface back.
#[test]
fn fini_drains_everything() {
    let mut fx = Fixture::new(test_config());
    let c = Completion::new();
    let dst = fx.heap(0);
    for len in [500, 5000, 50_000] {
        let src = pattern(len, 0);
        unsafe { fx.tp.put_nb(dst, &src, PEER, &c) }.unwrap();
    }
    assert_eq!(fx.tp.stats().outstanding_events, 3);

    let Fixture { mem, tp } = fx;
    let nic = tp.fini().unwrap();
    assert_eq!(nic.queued_events(), 0);
    assert!(c.is_complete());
    drop(mem);
}
