use super::*;
use crate::frag::{Completion, FragRef};
use crate::nic::MemDesc;

/// Puts.
impl<N: NetworkInterface> Transport<N> {
    /// Put a small payload to `target` on peer `pe`.
    ///
    /// The payload is consumed at issue time: `source` may be reused as soon
    /// as this returns. Remote completion is observed with
    /// [`Transport::quiet`].
    ///
    /// # Panics
    ///
    /// Panic if `source` exceeds the inline size limit.
    pub fn put_small(&mut self, target: *const u8, source: &[u8], pe: Pe) -> Result<()> {
        let tgt = self.target(target, pe)?;
        assert!(
            source.len() <= self.config.max_volatile_size,
            "put_small of {} bytes exceeds the inline limit {}",
            source.len(),
            self.config.max_volatile_size
        );
        self.put_volatile(source, tgt)
    }

    /// Put a payload of any size to `target` on peer `pe`.
    ///
    /// Payloads up to the inline limit are consumed at issue time. Payloads
    /// up to the bounce buffer size are copied into a bounce buffer, so
    /// `source` may be reused as soon as this returns. Larger payloads are
    /// sent straight from `source`: `completion` is incremented here and
    /// decremented when the transfer completes locally.
    ///
    /// # Safety
    ///
    /// If `source` is larger than the bounce buffer size, its memory must stay
    /// valid and unmodified until `completion` reports completion (see
    /// [`Transport::put_wait`]).
    pub unsafe fn put_nb(
        &mut self,
        target: *const u8,
        source: &[u8],
        pe: Pe,
        completion: &Completion,
    ) -> Result<()> {
        let tgt = self.target(target, pe)?;
        let len = source.len();

        if len <= self.config.max_volatile_size {
            return self.put_volatile(source, tgt);
        }

        self.acquire_slot()?;
        let ret = if len <= self.bounce.buf_size() {
            self.put_bounce(source, tgt)
        } else {
            self.put_long(source, tgt, completion)
        };
        if unlikely(ret.is_err()) {
            self.slots.release();
            return ret;
        }
        self.pending_put += 1;
        Ok(())
    }

    /// Issue a put from a bounce buffer. The caller holds the event slot.
    fn put_bounce(&mut self, source: &[u8], tgt: Target) -> Result<()> {
        let (idx, buf) = self.alloc_bounce(source)?;
        let ctx = FragRef::Bounce(idx).user_ctx();
        // SAFETY: the bounce buffer stays allocated until its event is drained.
        let ret = unsafe { self.nic.put(MemDesc::PutEvent, buf, source.len(), tgt, Some(ctx)) };
        if let Err(code) = ret {
            self.bounce.release(idx);
            return Err(ni_err("put")(code));
        }
        Ok(())
    }

    /// Issue a put straight from `source`. The caller holds the event slot
    /// and keeps `source` alive until `completion` drops back.
    fn put_long(&mut self, source: &[u8], tgt: Target, completion: &Completion) -> Result<()> {
        let idx = self.alloc_long(1)?;
        let frag = self.long_frags.get_mut(idx);
        frag.reference = 1;
        frag.completion = Some(completion.clone());

        let ctx = FragRef::Long(idx).user_ctx();
        let len = source.len();
        // SAFETY: guaranteed by the caller of `put_nb`.
        let ret = unsafe { self.nic.put(MemDesc::PutEvent, source.as_ptr(), len, tgt, Some(ctx)) };
        if let Err(code) = ret {
            self.put_long_ref(idx);
            return Err(ni_err("put")(code));
        }
        completion.incr();
        log::trace!("transport: long put of {} bytes to pe {} via fragment {}", len, tgt.pe, idx);
        Ok(())
    }

    #[inline]
    fn put_volatile(&mut self, source: &[u8], tgt: Target) -> Result<()> {
        // SAFETY: volatile puts consume the payload at issue time.
        unsafe {
            self.nic
                .put(MemDesc::PutVolatile, source.as_ptr(), source.len(), tgt, None)
        }
        .map_err(ni_err("put"))?;
        self.pending_put += 1;
        Ok(())
    }
}
