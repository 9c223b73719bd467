/// A fixed-capacity free list of records.
///
/// All records are created up front and recycled for the lifetime of the
/// list; they are only dropped together with it. Entries are handed out as
/// indices so that they can travel through the network interface's
/// user-context word.
pub(crate) struct FreeList<T> {
    /// Every record, allocated or not.
    items: Vec<T>,

    /// Indices of free records. Last released is first reused.
    free: Vec<u32>,

    /// Allocation state of each record, for catching double releases.
    in_use: Vec<bool>,
}

impl<T> FreeList<T> {
    /// Create a free list pre-populated with `count` records built by `init`.
    pub fn new(count: usize, mut init: impl FnMut(usize) -> T) -> Self {
        assert!(count <= u32::MAX as usize, "FreeList: too many records");
        Self {
            items: (0..count).map(&mut init).collect(),
            free: (0..count as u32).rev().collect(),
            in_use: vec![false; count],
        }
    }

    /// Take a free record, or `None` if all are in use.
    #[inline]
    pub fn alloc(&mut self) -> Option<u32> {
        let idx = self.free.pop()?;
        self.in_use[idx as usize] = true;
        Some(idx)
    }

    /// Return a record to the list.
    ///
    /// # Panics
    ///
    /// Panic if the record is not currently allocated.
    #[inline]
    pub fn release(&mut self, idx: u32) {
        let slot = &mut self.in_use[idx as usize];
        assert!(*slot, "FreeList: release of free record {}", idx);
        *slot = false;
        self.free.push(idx);
    }

    /// Return `true` if the record is currently allocated.
    #[inline]
    pub fn is_allocated(&self, idx: u32) -> bool {
        self.in_use.get(idx as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn get(&self, idx: u32) -> &T {
        &self.items[idx as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, idx: u32) -> &mut T {
        &mut self.items[idx as usize]
    }

    /// Number of free records.
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total number of records.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}
