use super::*;
use crate::frag::FragRef;
use crate::nic::EventKind;
use crate::util::thread_check::*;

/// Completion drain loop and event-slot admission.
impl<N: NetworkInterface> Transport<N> {
    /// Block for exactly one completion event and release what it tracks.
    ///
    /// A bounce buffer goes straight back to its pool. A long fragment
    /// reports one completed sub-operation to its completion counter and is
    /// returned to its pool when its last reference is gone.
    ///
    /// # Panics
    ///
    /// Panic on an event other than a send completion, or one whose tag does
    /// not name an in-flight fragment.
    pub fn drain_eq(&mut self) -> Result<()> {
        do_thread_check(self.thread_id);

        let ev = self.nic.eq_wait().map_err(ni_err("eq_wait"))?;
        if let Some(code) = ev.ni_fail {
            return Err(Error::EventFailure { code });
        }

        // The only event type we should see on a success is a send event.
        assert_eq!(ev.kind, EventKind::Send, "unexpected completion event {:?}", ev);
        self.slots.release();

        let frag = ev
            .user_ctx
            .and_then(FragRef::from_user_ctx)
            .unwrap_or_else(|| panic!("completion event with bad fragment tag: {:?}", ev));
        log::trace!("transport: drained completion of {:?}", frag);

        match frag {
            FragRef::Bounce(idx) => {
                assert!(self.bounce.is_allocated(idx), "completion of free bounce buffer {}", idx);
                self.bounce.release(idx);
            }
            FragRef::Long(idx) => {
                assert!(self.long_frags.is_allocated(idx), "completion of free long fragment {}", idx);
                if let Some(completion) = &self.long_frags.get(idx).completion {
                    completion.decr();
                }
                self.put_long_ref(idx);
            }
        }
        Ok(())
    }

    /// Take one event slot, draining completions until one is available.
    pub(super) fn acquire_slot(&mut self) -> Result<()> {
        while unlikely(!self.slots.try_acquire()) {
            self.drain_eq()?;
        }
        Ok(())
    }

    /// Drop one reference to a long fragment, freeing it on the last one.
    pub(super) fn put_long_ref(&mut self, idx: u32) {
        let frag = self.long_frags.get_mut(idx);
        debug_assert!(frag.reference > 0, "long fragment {} over-released", idx);
        frag.reference -= 1;
        if frag.reference == 0 {
            frag.completion = None;
            self.long_frags.release(idx);
        }
    }
}
