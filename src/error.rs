//! Error types and the default fatal-error policy.

use std::fmt;

use thiserror::Error;

use crate::nic::{CounterKind, NiError};

/// Which buffer pool an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Bounce-buffer pool.
    Bounce,

    /// Long-fragment pool.
    Long,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Bounce => f.write_str("bounce buffer"),
            PoolKind::Long => f.write_str("long fragment"),
        }
    }
}

/// Errors reported by transport operations.
///
/// None of these is locally recoverable: a half-completed one-sided operation
/// cannot be repaired by this process. They are returned rather than aborting
/// so that the host application chooses its own failure policy; use
/// [`OrAbort::or_abort`] for the conventional one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A network-interface call returned a non-success code.
    #[error("network interface {op} failed with code {}", .code.0)]
    Interface { op: &'static str, code: NiError },

    /// A completion event reported a network-interface failure.
    #[error("completion event reported failure code {}", .code.0)]
    EventFailure { code: NiError },

    /// A hardware completion counter reported failed operations.
    #[error("{counter:?} completion counter reported {failures} failure(s)")]
    CounterFailure { counter: CounterKind, failures: u64 },

    /// A pool stayed empty even after draining every outstanding event.
    #[error("{0} pool exhausted")]
    PoolExhausted(PoolKind),

    /// An address lies outside both symmetric regions.
    #[error("address {addr:#x} outside of symmetric areas")]
    OutsideSymmetric { addr: usize },

    /// Invalid configuration or region layout.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Return `true` if this error originates from the network interface
    /// (a failed call, event or completion counter).
    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            Error::Interface { .. } | Error::EventFailure { .. } | Error::CounterFailure { .. }
        )
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Report an unrecoverable error and abort the process.
#[cold]
pub fn fatal(err: &Error) -> ! {
    log::error!("fatal transport error: {}", err);
    std::process::abort()
}

/// Extension that applies the default fail-fast policy to a [`Result`].
pub trait OrAbort<T> {
    /// Unwrap the value, or report the error through [`fatal`].
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T> {
    #[inline]
    fn or_abort(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => fatal(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_classification() {
        let hw = Error::Interface {
            op: "put",
            code: NiError(3),
        };
        assert!(hw.is_hardware());
        assert!(Error::CounterFailure {
            counter: CounterKind::Put,
            failures: 1
        }
        .is_hardware());
        assert!(!Error::PoolExhausted(PoolKind::Bounce).is_hardware());
        assert!(!Error::OutsideSymmetric { addr: 0x10 }.is_hardware());
    }

    #[test]
    fn messages() {
        let e = Error::OutsideSymmetric { addr: 0xdead };
        assert_eq!(e.to_string(), "address 0xdead outside of symmetric areas");
        assert_eq!(
            Error::PoolExhausted(PoolKind::Long).to_string(),
            "long fragment pool exhausted"
        );
    }
}
