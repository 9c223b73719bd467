//! A one-sided communication transport for OpenSHMEM-style symmetric memory.
//!
//! The [`Transport`] issues puts, gets and atomics against symmetric memory on
//! peer processes through a [`NetworkInterface`], choosing between inline,
//! bounce-buffered and zero-copy strategies by payload size, and keeps the
//! interface's completion-event queue from ever overflowing.

mod addr;
mod config;
mod error;
mod flow;
mod frag;
pub mod nic;
mod pool;
mod transport;
pub mod type_alias;
mod util;

pub use self::addr::{AddrMode, AddrTranslator, RegionId, RemoteAccess, SymmetricRegion};
pub use self::config::TransportConfig;
pub use self::error::{fatal, Error, OrAbort, PoolKind, Result};
pub use self::frag::Completion;
pub use self::nic::{AtomicOp, Datatype, NetworkInterface, SwapOp};
pub use self::transport::{Transport, TransportStats};

#[cfg(test)]
mod tests;
