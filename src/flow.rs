//! Admission control over the completion-event queue.

/// Counting gate over the event queue's capacity.
///
/// Every event-generating operation must hold a slot from issue until its
/// completion event is drained. Acquisition is optimistic: the counter is
/// decremented and, if that leaves no slot to spare, restored. The caller
/// then drains one completion (which releases a slot) and tries again, so
/// at most `capacity - 1` events are ever outstanding and the queue can
/// never overflow.
#[derive(Debug)]
pub(crate) struct EventSlots {
    available: i32,
    capacity: i32,
}

impl EventSlots {
    /// Create a gate over an event queue of the given depth.
    pub fn new(capacity: usize) -> Self {
        let capacity = i32::try_from(capacity).expect("event queue depth overflows i32");
        assert!(capacity >= 2, "event queue depth must be at least 2");
        Self {
            available: capacity,
            capacity,
        }
    }

    /// Try to take a slot. On failure the count is left unchanged.
    #[inline]
    pub fn try_acquire(&mut self) -> bool {
        self.available -= 1;
        if self.available <= 0 {
            self.available += 1;
            false
        } else {
            true
        }
    }

    /// Return the slot of a drained completion.
    #[inline]
    pub fn release(&mut self) {
        debug_assert!(self.available < self.capacity, "event slot over-release");
        self.available += 1;
    }

    /// Slots currently available.
    #[inline]
    pub fn available(&self) -> i32 {
        self.available
    }

    /// Completion events currently outstanding.
    #[inline]
    pub fn outstanding(&self) -> usize {
        (self.capacity - self.available) as usize
    }
}
