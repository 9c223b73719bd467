use super::*;
use crate::frag::Completion;
use crate::nic::CounterKind;
use crate::util::thread_check::*;

/// Completion waits.
impl<N: NetworkInterface> Transport<N> {
    /// Wait until every put and atomic issued so far has been acknowledged
    /// by its target.
    pub fn quiet(&mut self) -> Result<()> {
        do_thread_check(self.thread_id);
        self.wait_counter(CounterKind::Put, self.pending_put)
    }

    /// Order puts and atomics issued before this call ahead of those issued
    /// after it. Implemented as a full [`Transport::quiet`].
    #[inline]
    pub fn fence(&mut self) -> Result<()> {
        self.quiet()
    }

    /// Wait until every get, swap and fetching atomic issued so far has
    /// delivered its reply.
    pub fn get_wait(&mut self) -> Result<()> {
        do_thread_check(self.thread_id);
        self.wait_counter(CounterKind::Get, self.pending_get)
    }

    /// Drain completions until `completion` has nothing pending, so the
    /// source buffers of the operations it tracks may be reused.
    pub fn put_wait(&mut self, completion: &Completion) -> Result<()> {
        do_thread_check(self.thread_id);
        while completion.pending() > 0 {
            self.drain_eq()?;
        }
        Ok(())
    }

    fn wait_counter(&mut self, counter: CounterKind, test: SeqNum) -> Result<()> {
        let ct = self.nic.ct_wait(counter, test).map_err(ni_err("ct_wait"))?;
        if unlikely(ct.failure != 0) {
            return Err(Error::CounterFailure {
                counter,
                failures: ct.failure,
            });
        }
        Ok(())
    }
}
