#![allow(unused_imports)]

mod corners;
mod flow;

use super::{type_alias::*, *};
use crate::nic::{loopback::*, *};
use std::sync::Once;

use simple_logger::SimpleLogger;

const PES: usize = 2;
const DATA_LEN: usize = 1 << 12;
const HEAP_LEN: usize = 1 << 20;

/// The peer every test targets.
const PEER: Pe = 1;

/// Install a logger once per test binary.
fn init_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = SimpleLogger::new().with_level(log::LevelFilter::Warn).init();
    });
}

/// Configuration used by most tests: 4 KiB bounce buffers and a small
/// event queue so that flow control kicks in quickly.
fn test_config() -> TransportConfig {
    TransportConfig::new()
        .with_bounce_buffer_size(4096)
        .with_bounce_buffers(16)
        .with_long_frags(16)
        .with_max_volatile_size(256)
        .with_event_queue_depth(8)
}

/// A transport over a loopback interface, plus the local memory backing its
/// symmetric regions. The data region sits right below the heap.
struct Fixture {
    mem: Vec<u8>,
    tp: Transport<LoopbackNic>,
}

impl Fixture {
    fn new(config: TransportConfig) -> Self {
        let nic = LoopbackNic::new(PES, DATA_LEN, HEAP_LEN, config.event_queue_depth);
        Self::with_nic(nic, config)
    }

    fn with_nic(nic: LoopbackNic, config: TransportConfig) -> Self {
        init_logger();
        let mem = vec![0u8; DATA_LEN + HEAP_LEN];
        let data = SymmetricRegion::from_slice(&mem[..DATA_LEN]);
        let heap = SymmetricRegion::from_slice(&mem[DATA_LEN..]);
        let tp = Transport::new(nic, config, data, heap).unwrap();
        Self { mem, tp }
    }

    /// Local address `off` bytes into the data region.
    fn data(&self, off: usize) -> *const u8 {
        assert!(off < DATA_LEN);
        self.mem[off..].as_ptr()
    }

    /// Local address `off` bytes into the heap.
    fn heap(&self, off: usize) -> *const u8 {
        assert!(off < HEAP_LEN);
        self.mem[DATA_LEN + off..].as_ptr()
    }

    /// The target peer's memory.
    fn peer(&self, region: RegionId) -> &[u8] {
        self.tp.nic().peer_mem(PEER, region)
    }

    fn peer_mut(&mut self, region: RegionId) -> &mut [u8] {
        self.tp.nic_mut().peer_mem_mut(PEER, region)
    }
}

/// A recognizable byte pattern.
fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Native-endian bytes of a run of 64-bit words.
fn words(v: &[u64]) -> Vec<u8> {
    v.iter().flat_map(|w| w.to_ne_bytes()).collect()
}

/// 64-bit words stored in `b`.
fn read_words(b: &[u8]) -> Vec<u64> {
    b.chunks_exact(8)
        .map(|c| u64::from_ne_bytes(c.try_into().unwrap()))
        .collect()
}
