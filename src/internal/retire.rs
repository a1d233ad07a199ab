use crate::error::Error;

/// Objects a thread has unlinked but not yet reclaimed.
///
/// Only the owning thread appends to or compacts its list.
pub(crate) struct RetireList<T> {
    entries: Vec<*mut T>,
    capacity: usize,
}

impl<T> RetireList<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// # Panics
    ///
    /// Panics if the list already holds `capacity` objects.
    pub fn push(&mut self, ptr: *mut T) {
        assert!(
            self.entries.len() < self.capacity,
            "{}",
            Error::RetireListFull {
                capacity: self.capacity
            }
        );
        self.entries.push(ptr);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes every entry whose identity `is_protected` rejects and
    /// returns them in list order. Entries that stay keep their relative
    /// order.
    pub fn take_unprotected<F>(&mut self, mut is_protected: F) -> Vec<*mut T>
    where
        F: FnMut(usize) -> bool,
    {
        let mut unprotected = Vec::new();
        self.entries.retain(|&ptr| {
            if is_protected(ptr as usize) {
                true
            } else {
                unprotected.push(ptr);
                false
            }
        });
        unprotected
    }

    /// Puts back entries taken by [`RetireList::take_unprotected`] that
    /// were never reclaimed. They may push the list past its capacity.
    pub fn restore<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = *mut T>,
    {
        self.entries.extend(entries);
    }

    /// Empties the list regardless of hazards.
    pub fn take_all(&mut self) -> Vec<*mut T> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake(addr: usize) -> *mut u64 {
        addr as *mut u64
    }

    #[test]
    fn compaction_keeps_order_of_survivors() {
        let mut list = RetireList::new(8);
        for addr in [0x10, 0x20, 0x30, 0x40, 0x50] {
            list.push(fake(addr));
        }

        let freed = list.take_unprotected(|id| id == 0x20 || id == 0x40);
        assert_eq!(freed, vec![fake(0x10), fake(0x30), fake(0x50)]);
        assert_eq!(list.len(), 2);

        let rest = list.take_all();
        assert_eq!(rest, vec![fake(0x20), fake(0x40)]);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn restore_appends_after_survivors() {
        let mut list = RetireList::new(4);
        for addr in [0x10, 0x20, 0x30] {
            list.push(fake(addr));
        }
        let freed = list.take_unprotected(|id| id == 0x20);
        list.restore(freed.into_iter().skip(1));
        assert_eq!(list.take_all(), vec![fake(0x20), fake(0x30)]);
    }

    #[test]
    #[should_panic(expected = "retire list full")]
    fn push_past_capacity_panics() {
        let mut list = RetireList::new(2);
        list.push(fake(0x10));
        list.push(fake(0x20));
        list.push(fake(0x30));
    }
}
