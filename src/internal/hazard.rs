use core::sync::atomic::{AtomicUsize, Ordering};

/// One thread's hazard slots.
///
/// Written only by the owning thread, read by every scanning thread.
/// A slot holds `0` when unused, otherwise the identity of the object
/// the owner is inspecting.
pub(crate) struct HazardRow {
    slots: Box<[AtomicUsize]>,
}

impl HazardRow {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: (0..slots).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    #[inline(always)]
    pub fn publish(&self, slot: usize, identity: usize, order: Ordering) {
        self.slots[slot].store(identity, order);
    }

    #[inline(always)]
    pub fn clear(&self, slot: usize) {
        self.slots[slot].store(0, Ordering::Release);
    }

    pub fn clear_all(&self) {
        for slot in self.slots.iter() {
            slot.store(0, Ordering::Release);
        }
    }

    /// Whether any slot of this row currently holds `identity`.
    pub fn protects(&self, identity: usize) -> bool {
        self.slots
            .iter()
            .rev()
            .any(|slot| slot.load(Ordering::Acquire) == identity)
    }

    #[cfg(test)]
    pub fn get(&self, slot: usize) -> usize {
        self.slots[slot].load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_all_releases_every_slot() {
        let row = HazardRow::new(3);
        row.publish(0, 0x1000, Ordering::SeqCst);
        row.publish(2, 0x2000, Ordering::SeqCst);
        assert!(row.protects(0x1000));
        assert!(row.protects(0x2000));

        row.clear(0);
        assert!(!row.protects(0x1000));
        assert_eq!(row.get(2), 0x2000);

        row.clear_all();
        assert!(!row.protects(0x2000));
        assert_eq!(row.get(2), 0);
    }
}
