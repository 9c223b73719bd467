//! Transport configuration.

use serde::{Deserialize, Serialize};

use crate::addr::AddrMode;
use crate::error::{Error, Result};
use crate::nic::NiLimits;

/// Transport configuration.
///
/// Size thresholds select the put/atomic strategy; counts size the two
/// buffer pools and the event-slot gate. The size limits are further clamped
/// to what the network interface reports in [`NiLimits`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Capacity of each bounce buffer in bytes (the eager size).
    /// Default: 2048
    pub bounce_buffer_size: usize,
    /// Number of bounce buffers.
    /// Default: 128
    pub bounce_buffers: usize,
    /// Number of long-fragment records.
    /// Default: 2048
    pub long_frags: usize,
    /// Largest put/atomic issued straight from the caller's buffer without
    /// event tracking.
    /// Default: 64
    pub max_volatile_size: usize,
    /// Largest payload of a single atomic operation.
    /// Default: 512
    pub max_atomic_size: usize,
    /// Largest payload of a single fetching atomic.
    /// Default: 32
    pub max_fetch_atomic_size: usize,
    /// Completion-event queue depth, i.e. the event-slot capacity.
    /// Default: 64
    pub event_queue_depth: usize,
    /// Symmetric address classification mode.
    /// Default: [`AddrMode::Checked`]
    pub addr_mode: AddrMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bounce_buffer_size: 2048,
            bounce_buffers: 128,
            long_frags: 2048,
            max_volatile_size: 64,
            max_atomic_size: 512,
            max_fetch_atomic_size: 32,
            event_queue_depth: 64,
            addr_mode: AddrMode::Checked,
        }
    }
}

impl TransportConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounce buffer capacity.
    pub fn with_bounce_buffer_size(mut self, bounce_buffer_size: usize) -> Self {
        self.bounce_buffer_size = bounce_buffer_size;
        self
    }

    /// Set the number of bounce buffers.
    pub fn with_bounce_buffers(mut self, bounce_buffers: usize) -> Self {
        self.bounce_buffers = bounce_buffers;
        self
    }

    /// Set the number of long fragments.
    pub fn with_long_frags(mut self, long_frags: usize) -> Self {
        self.long_frags = long_frags;
        self
    }

    /// Set the inline (volatile) size limit.
    pub fn with_max_volatile_size(mut self, max_volatile_size: usize) -> Self {
        self.max_volatile_size = max_volatile_size;
        self
    }

    /// Set the maximum atomic payload.
    pub fn with_max_atomic_size(mut self, max_atomic_size: usize) -> Self {
        self.max_atomic_size = max_atomic_size;
        self
    }

    /// Set the maximum fetching-atomic payload.
    pub fn with_max_fetch_atomic_size(mut self, max_fetch_atomic_size: usize) -> Self {
        self.max_fetch_atomic_size = max_fetch_atomic_size;
        self
    }

    /// Set the completion-event queue depth.
    pub fn with_event_queue_depth(mut self, event_queue_depth: usize) -> Self {
        self.event_queue_depth = event_queue_depth;
        self
    }

    /// Set the address classification mode.
    pub fn with_addr_mode(mut self, addr_mode: AddrMode) -> Self {
        self.addr_mode = addr_mode;
        self
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        let nonzero = [
            ("bounce_buffer_size", self.bounce_buffer_size),
            ("bounce_buffers", self.bounce_buffers),
            ("long_frags", self.long_frags),
            ("max_atomic_size", self.max_atomic_size),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} cannot be 0", name)));
            }
        }

        // The slot gate admits at most `depth - 1` outstanding events.
        if self.event_queue_depth < 2 {
            return Err(Error::InvalidConfig(format!(
                "event_queue_depth must be at least 2, got {}",
                self.event_queue_depth
            )));
        }
        if self.event_queue_depth > i32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "event_queue_depth {} too large",
                self.event_queue_depth
            )));
        }
        if self.max_volatile_size > self.bounce_buffer_size {
            return Err(Error::InvalidConfig(format!(
                "max_volatile_size ({}) exceeds bounce_buffer_size ({})",
                self.max_volatile_size, self.bounce_buffer_size
            )));
        }
        Ok(())
    }

    /// Return a copy with size limits clamped to what the interface supports.
    pub(crate) fn clamp_to(&self, limits: &NiLimits) -> Self {
        let mut cfg = self.clone();
        cfg.max_volatile_size = cfg.max_volatile_size.min(limits.max_volatile_size);
        cfg.max_atomic_size = cfg.max_atomic_size.min(limits.max_atomic_size);
        cfg.max_fetch_atomic_size = cfg.max_fetch_atomic_size.min(limits.max_fetch_atomic_size);
        cfg.event_queue_depth = cfg.event_queue_depth.min(limits.max_eq_depth);
        if cfg != *self {
            log::debug!("transport config clamped to interface limits: {:?}", cfg);
        }
        cfg
    }
}
