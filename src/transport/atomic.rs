use super::*;
use crate::frag::{Completion, FragRef};
use crate::nic::{AtomicOp, Datatype, MemDesc};
use crate::util::math::rounddown;

/// Non-fetching atomics.
impl<N: NetworkInterface> Transport<N> {
    /// Apply a small atomic to `target` on peer `pe`.
    ///
    /// The operand is consumed at issue time.
    ///
    /// # Panics
    ///
    /// Panic if `source` exceeds the inline size limit.
    pub fn atomic_small(
        &mut self,
        target: *const u8,
        source: &[u8],
        pe: Pe,
        op: AtomicOp,
        dtype: Datatype,
    ) -> Result<()> {
        let tgt = self.target(target, pe)?;
        assert!(
            source.len() <= self.config.max_volatile_size,
            "atomic_small of {} bytes exceeds the inline limit {}",
            source.len(),
            self.config.max_volatile_size
        );
        self.atomic_volatile(source, tgt, op, dtype)
    }

    /// Apply an atomic of any size to `target` on peer `pe`.
    ///
    /// Operands up to the inline limit are consumed at issue time; operands
    /// that fit both a bounce buffer and the atomic size limit are copied.
    /// Larger operands are split into chunks of at most the atomic size
    /// limit, each sent straight from `source` and each counted once in
    /// `completion`.
    ///
    /// # Safety
    ///
    /// If the operand is neither inlined nor copied, `source` must stay valid
    /// and unmodified until `completion` reports completion.
    pub unsafe fn atomic_nb(
        &mut self,
        target: *const u8,
        source: &[u8],
        pe: Pe,
        op: AtomicOp,
        dtype: Datatype,
        completion: &Completion,
    ) -> Result<()> {
        let tgt = self.target(target, pe)?;
        let len = source.len();

        if len <= self.config.max_volatile_size {
            return self.atomic_volatile(source, tgt, op, dtype);
        }

        if len <= self.bounce.buf_size() && len <= self.config.max_atomic_size {
            self.acquire_slot()?;
            if let Err(e) = self.atomic_bounce(source, tgt, op, dtype) {
                self.slots.release();
                return Err(e);
            }
            self.pending_put += 1;
            return Ok(());
        }

        // Never split an element across chunks.
        let elem = dtype.size();
        if unlikely(self.config.max_atomic_size < elem) {
            return Err(Error::InvalidConfig(format!(
                "max_atomic_size ({}) is smaller than one {:?} element",
                self.config.max_atomic_size, dtype
            )));
        }
        let chunk = rounddown(self.config.max_atomic_size, elem);

        // The issuer holds its own reference until every chunk is out, so a
        // drain while waiting for a slot cannot free the fragment.
        let idx = self.alloc_long(0)?;
        let frag = self.long_frags.get_mut(idx);
        frag.reference = 1;
        frag.completion = Some(completion.clone());

        let ret = self.atomic_chunks(idx, source, tgt, chunk, op, dtype, completion);
        self.put_long_ref(idx);
        let chunks = ret?;

        log::trace!(
            "transport: atomic of {} bytes to pe {} split into {} chunks",
            len,
            pe,
            chunks
        );
        Ok(())
    }

    /// Issue an atomic from a bounce buffer. The caller holds the event slot.
    fn atomic_bounce(
        &mut self,
        source: &[u8],
        tgt: Target,
        op: AtomicOp,
        dtype: Datatype,
    ) -> Result<()> {
        let (idx, buf) = self.alloc_bounce(source)?;
        let ctx = FragRef::Bounce(idx).user_ctx();
        // SAFETY: the bounce buffer stays allocated until its event is drained.
        let ret = unsafe {
            self.nic
                .atomic(MemDesc::PutEvent, buf, source.len(), tgt, Some(ctx), op, dtype)
        };
        if let Err(code) = ret {
            self.bounce.release(idx);
            return Err(ni_err("atomic")(code));
        }
        Ok(())
    }

    /// Issue `source` in chunks tracked by long fragment `idx` and return the
    /// number of chunks. On failure the chunks already issued stay in flight
    /// and counted in `completion`.
    #[allow(clippy::too_many_arguments)]
    unsafe fn atomic_chunks(
        &mut self,
        idx: u32,
        source: &[u8],
        tgt: Target,
        chunk: usize,
        op: AtomicOp,
        dtype: Datatype,
        completion: &Completion,
    ) -> Result<usize> {
        let ctx = FragRef::Long(idx).user_ctx();
        let len = source.len();

        let mut sent = 0;
        let mut chunks = 0;
        while sent < len {
            let n = chunk.min(len - sent);
            self.acquire_slot()?;

            let part = Target {
                pe: tgt.pe,
                access: tgt.access.advance(sent),
            };
            let ret = self.nic.atomic(
                MemDesc::PutEvent,
                source.as_ptr().add(sent),
                n,
                part,
                Some(ctx),
                op,
                dtype,
            );
            if let Err(code) = ret {
                self.slots.release();
                return Err(ni_err("atomic")(code));
            }
            self.long_frags.get_mut(idx).reference += 1;
            completion.incr();
            self.pending_put += 1;
            sent += n;
            chunks += 1;
        }
        Ok(chunks)
    }

    #[inline]
    fn atomic_volatile(
        &mut self,
        source: &[u8],
        tgt: Target,
        op: AtomicOp,
        dtype: Datatype,
    ) -> Result<()> {
        // SAFETY: volatile atomics consume the operand at issue time.
        unsafe {
            self.nic.atomic(
                MemDesc::PutVolatile,
                source.as_ptr(),
                source.len(),
                tgt,
                None,
                op,
                dtype,
            )
        }
        .map_err(ni_err("atomic"))?;
        self.pending_put += 1;
        Ok(())
    }
}
