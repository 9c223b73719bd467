use super::*;
use crate::nic::{AtomicOp, Datatype, SwapOp};

/// Gets, swaps and fetching atomics: everything whose reply lands through
/// the get counter.
impl<N: NetworkInterface> Transport<N> {
    /// Fetch `dest.len()` bytes from `source` on peer `pe` into `dest` and
    /// wait for them to land.
    ///
    /// This also waits for every other outstanding get-channel reply.
    pub fn get(&mut self, dest: &mut [u8], source: *const u8, pe: Pe) -> Result<()> {
        // SAFETY: `dest` stays borrowed until the reply has landed.
        unsafe { self.get_nb(dest, source, pe)? };
        self.get_wait()
    }

    /// Start fetching `dest.len()` bytes from `source` on peer `pe` into
    /// `dest`.
    ///
    /// # Safety
    ///
    /// `dest` must stay valid and must not be accessed until
    /// [`Transport::get_wait`] returns.
    pub unsafe fn get_nb(&mut self, dest: &mut [u8], source: *const u8, pe: Pe) -> Result<()> {
        let tgt = self.target(source, pe)?;
        self.nic
            .get(dest.as_mut_ptr(), dest.len(), tgt)
            .map_err(ni_err("get"))?;
        self.pending_get += 1;
        Ok(())
    }

    /// Atomically replace the element at `target` on peer `pe` with `source`;
    /// the previous value lands in `dest`.
    ///
    /// # Safety
    ///
    /// Same as [`Transport::get_nb`] for `dest`.
    pub unsafe fn swap(
        &mut self,
        target: *const u8,
        source: &[u8],
        dest: &mut [u8],
        pe: Pe,
        dtype: Datatype,
    ) -> Result<()> {
        self.swap_op(SwapOp::Swap, target, source, dest, None, pe, dtype)
    }

    /// Like [`Transport::swap`], but only if the target equals `operand`.
    ///
    /// # Safety
    ///
    /// Same as [`Transport::get_nb`] for `dest`.
    pub unsafe fn cswap(
        &mut self,
        target: *const u8,
        source: &[u8],
        dest: &mut [u8],
        operand: &[u8],
        pe: Pe,
        dtype: Datatype,
    ) -> Result<()> {
        self.swap_op(SwapOp::Cswap, target, source, dest, Some(operand), pe, dtype)
    }

    /// Like [`Transport::swap`], but only the bits set in `mask` are replaced.
    ///
    /// # Safety
    ///
    /// Same as [`Transport::get_nb`] for `dest`.
    pub unsafe fn mswap(
        &mut self,
        target: *const u8,
        source: &[u8],
        dest: &mut [u8],
        mask: &[u8],
        pe: Pe,
        dtype: Datatype,
    ) -> Result<()> {
        self.swap_op(SwapOp::Mswap, target, source, dest, Some(mask), pe, dtype)
    }

    /// Apply `op` to the element at `target` on peer `pe`; the previous value
    /// lands in `dest`.
    ///
    /// # Safety
    ///
    /// Same as [`Transport::get_nb`] for `dest`.
    ///
    /// # Panics
    ///
    /// Panic if the operand exceeds the fetching-atomic or inline size limit.
    pub unsafe fn fetch_atomic(
        &mut self,
        target: *const u8,
        source: &[u8],
        dest: &mut [u8],
        pe: Pe,
        op: AtomicOp,
        dtype: Datatype,
    ) -> Result<()> {
        let tgt = self.target(target, pe)?;
        let len = source.len();
        assert_eq!(len, dest.len(), "fetch_atomic operand and result differ in size");
        assert!(
            len <= self.config.max_fetch_atomic_size && len <= self.config.max_volatile_size,
            "fetch_atomic of {} bytes exceeds the size limit",
            len
        );

        self.nic
            .fetch_atomic(dest.as_mut_ptr(), source.as_ptr(), len, tgt, op, dtype)
            .map_err(ni_err("fetch_atomic"))?;
        self.pending_get += 1;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn swap_op(
        &mut self,
        op: SwapOp,
        target: *const u8,
        source: &[u8],
        dest: &mut [u8],
        operand: Option<&[u8]>,
        pe: Pe,
        dtype: Datatype,
    ) -> Result<()> {
        let tgt = self.target(target, pe)?;
        let len = source.len();
        assert_eq!(len, dest.len(), "{:?} operand and result differ in size", op);
        assert!(
            len <= Datatype::MAX_SIZE && len <= self.config.max_volatile_size,
            "{:?} of {} bytes exceeds the size limit",
            op,
            len
        );
        if let Some(operand) = operand {
            assert_eq!(operand.len(), len, "{:?} operand has the wrong size", op);
        }

        self.nic
            .swap(
                dest.as_mut_ptr(),
                source.as_ptr(),
                len,
                tgt,
                operand.map(<[u8]>::as_ptr),
                op,
                dtype,
            )
            .map_err(ni_err("swap"))?;
        self.pending_get += 1;
        Ok(())
    }
}
