use core::cell::UnsafeCell;
use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use atomic::Ordering;
use crossbeam_utils::CachePadded;
use log::{debug, trace};

use crate::atomic_link::AtomicLink;
use crate::config::Config;
use crate::error::Error;
use crate::internal::{heavy, light, HazardRow, Registry, RetireList, ThreadHandle};
use crate::shared_ptr::Shared;

/// Destructor invoked on every object once no hazard slot holds it.
pub type Reclaim<T> = Box<dyn Fn(Box<T>) + Send + Sync>;

/// Hazard pointers and retire lists for one family of objects.
///
/// A domain holds one row of hazard slots and one retire list per
/// thread of its [`Registry`]. Readers [`protect`] a pointer before
/// dereferencing it and [`clear`] the slot when done; writers that
/// unlink an object [`retire`] it instead of freeing it. The object is
/// passed to the reclaim callback once no thread's slot holds it any
/// more.
///
/// Dropping the domain reclaims every object still pending in any retire
/// list, whether or not a slot still holds it.
///
/// [`protect`]: Domain::protect
/// [`clear`]: Domain::clear
/// [`retire`]: Domain::retire
pub struct Domain<T> {
    registry: Arc<Registry>,
    config: Config,
    hazards: Box<[CachePadded<HazardRow>]>,
    retired: Box<[CachePadded<UnsafeCell<RetireList<T>>>]>,
    reclaim: Reclaim<T>,
}

// Each retire list is only touched by the thread owning the matching
// `ThreadHandle`, which cannot leave that thread.
unsafe impl<T: Send> Send for Domain<T> {}
unsafe impl<T: Send + Sync> Sync for Domain<T> {}

impl<T> Domain<T> {
    /// Creates a domain on the global registry that drops reclaimed objects.
    pub fn new(config: Config) -> Self
    where
        T: 'static,
    {
        Self::with_reclaim(config, drop)
    }

    /// Creates a domain on the global registry.
    pub fn with_reclaim<F>(config: Config, reclaim: F) -> Self
    where
        F: Fn(Box<T>) + Send + Sync + 'static,
    {
        Self::with_registry(Registry::global().clone(), config, reclaim)
    }

    /// Creates a domain accepting handles of `registry`, sized for its
    /// maximum thread count.
    pub fn with_registry<F>(registry: Arc<Registry>, config: Config, reclaim: F) -> Self
    where
        F: Fn(Box<T>) + Send + Sync + 'static,
    {
        let threads = registry.max_threads();
        let capacity = config.retire_capacity(threads);
        let hazards = (0..threads)
            .map(|_| CachePadded::new(HazardRow::new(config.slots_per_thread())))
            .collect();
        let retired = (0..threads)
            .map(|_| CachePadded::new(UnsafeCell::new(RetireList::new(capacity))))
            .collect();
        debug!(
            "hazard domain created: {} threads, {} slots each, scan threshold {}",
            threads,
            config.slots_per_thread(),
            config.scan_threshold()
        );
        Self {
            registry,
            config,
            hazards,
            retired,
            reclaim: Box::new(reclaim),
        }
    }

    /// Returns the calling thread's handle in this domain's registry.
    pub fn register(&self) -> ThreadHandle {
        self.registry.register()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> Config {
        self.config
    }

    #[inline]
    fn check_handle(&self, handle: ThreadHandle) {
        assert!(
            handle.registry() == self.registry.id(),
            "{}",
            Error::ForeignHandle
        );
    }

    #[inline]
    fn row(&self, handle: ThreadHandle, slot: usize) -> &HazardRow {
        self.check_handle(handle);
        assert!(
            slot < self.config.slots_per_thread(),
            "{}",
            Error::SlotOutOfRange {
                slot,
                slots_per_thread: self.config.slots_per_thread(),
            }
        );
        &self.hazards[handle.index()]
    }

    /// Reads `link` and protects what it read in `slot`.
    ///
    /// The returned pointer was still the value of `link` after it had
    /// been published, so it cannot have been reclaimed and stays valid
    /// until the slot is cleared or overwritten.
    pub fn protect(&self, handle: ThreadHandle, slot: usize, link: &AtomicLink<T>) -> Shared<T> {
        let row = self.row(handle, slot);
        let mut ptr = link.load(Ordering::Relaxed);
        loop {
            row.publish(slot, ptr.identity(), Ordering::Release);
            light();
            let new_ptr = link.load(Ordering::Acquire);
            if ptr == new_ptr {
                return ptr;
            }
            ptr = new_ptr;
        }
    }

    /// Protects a pointer the caller already read, without re-validating
    /// it against its source.
    ///
    /// Only sound when the caller's own protocol guarantees `ptr` cannot
    /// have been retired before this call, e.g. it was just installed by
    /// a successful compare-exchange, or another slot still holds it.
    pub fn protect_ptr(&self, handle: ThreadHandle, slot: usize, ptr: Shared<T>) -> Shared<T> {
        let row = self.row(handle, slot);
        row.publish(slot, ptr.identity(), Ordering::Release);
        light();
        ptr
    }

    /// Like [`Domain::protect_ptr`], but the publication is only ordered
    /// before the caller's later stores, not before its later loads.
    pub fn protect_release(&self, handle: ThreadHandle, slot: usize, ptr: Shared<T>) -> Shared<T> {
        let row = self.row(handle, slot);
        row.publish(slot, ptr.identity(), Ordering::Release);
        ptr
    }

    pub fn clear(&self, handle: ThreadHandle, slot: usize) {
        self.row(handle, slot).clear(slot);
    }

    pub fn clear_all(&self, handle: ThreadHandle) {
        self.check_handle(handle);
        self.hazards[handle.index()].clear_all();
    }

    /// Protects `link` in `slot` for the duration of `f`.
    ///
    /// The slot is cleared when `f` returns or unwinds.
    pub fn with_protected<R, F>(
        &self,
        handle: ThreadHandle,
        slot: usize,
        link: &AtomicLink<T>,
        f: F,
    ) -> R
    where
        F: FnOnce(Option<&T>) -> R,
    {
        let ptr = self.protect(handle, slot, link);
        let _clear = scopeguard::guard((), |_| self.clear(handle, slot));
        f(unsafe { ptr.as_ref() })
    }

    /// Hands an unlinked object over for reclamation.
    ///
    /// The object joins the calling thread's retire list. When the list
    /// reaches the scan threshold, every object in it that no hazard slot
    /// holds is reclaimed right away.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Owned::into_shared`](crate::Owned::into_shared),
    /// must already be unreachable from every link other threads may
    /// still load from, and must be retired only once.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is null or the thread's retire list is full.
    pub unsafe fn retire(&self, handle: ThreadHandle, ptr: Shared<T>) {
        self.check_handle(handle);
        assert!(!ptr.is_null(), "cannot retire a null pointer");

        let pending = {
            let list = &mut *self.retired[handle.index()].get();
            list.push(ptr.untagged_raw());
            list.len()
        };
        if pending >= self.config.scan_threshold() {
            self.scan(handle);
        }
    }

    /// Reclaims every object in the calling thread's retire list that no
    /// hazard slot holds.
    pub fn scan(&self, handle: ThreadHandle) {
        self.check_handle(handle);
        heavy();

        let unprotected = {
            // Safety: only the thread holding `handle` reaches this list,
            // and the borrow ends before any reclaim callback runs.
            let list = unsafe { &mut *self.retired[handle.index()].get() };
            let before = list.len();
            let unprotected = list.take_unprotected(|identity| self.is_protected(identity));
            trace!(
                "scan by thread {}: {} retired, {} reclaimable",
                handle.index(),
                before,
                unprotected.len()
            );
            unprotected
        };

        // If a reclaim call unwinds, whatever it did not reach goes back
        // to the list and stays pending.
        let mut unprotected = scopeguard::guard_on_unwind(unprotected.into_iter(), |rest| {
            let list = unsafe { &mut *self.retired[handle.index()].get() };
            list.restore(rest);
        });
        for ptr in &mut *unprotected {
            (self.reclaim)(unsafe { Box::from_raw(ptr) });
        }
    }

    fn is_protected(&self, identity: usize) -> bool {
        self.hazards.iter().any(|row| row.protects(identity))
    }

    /// Number of objects the calling thread retired that are still
    /// waiting for reclamation.
    pub fn pending(&self, handle: ThreadHandle) -> usize {
        self.check_handle(handle);
        unsafe { &*self.retired[handle.index()].get() }.len()
    }
}

impl<T> Drop for Domain<T> {
    fn drop(&mut self) {
        let pending: Vec<*mut T> = self
            .retired
            .iter_mut()
            .flat_map(|list| list.get_mut().take_all())
            .collect();
        let count = pending.len();
        let reclaim = &self.reclaim;

        // The drain is unconditional: a panicking reclaim call does not
        // stop the remaining objects from being reclaimed.
        let mut pending = scopeguard::guard_on_unwind(pending.into_iter(), |rest| {
            for ptr in rest {
                let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                    reclaim(unsafe { Box::from_raw(ptr) })
                }));
            }
        });
        for ptr in &mut *pending {
            reclaim(unsafe { Box::from_raw(ptr) });
        }
        debug!("hazard domain dropped, {} pending objects reclaimed", count);
    }
}

impl<T> fmt::Debug for Domain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("max_threads", &self.registry.max_threads())
            .field("config", &self.config)
            .finish()
    }
}
