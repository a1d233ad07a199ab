use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam_utils::CachePadded;
use log::trace;
use rustc_hash::FxHashMap;
use static_assertions::assert_not_impl_any;

use crate::config::DEFAULT_MAX_THREADS;
use crate::error::Error;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(0);

// Handle index of the current thread, per registry id. Registry ids are
// never reused, so a stale entry can never be mistaken for a live one.
thread_local! {
    static HANDLES: RefCell<FxHashMap<u64, usize>> = RefCell::new(FxHashMap::default());
}

/// Hands out thread handles.
///
/// A thread receives its handle the first time it registers and keeps it
/// for the rest of its life; registering again returns the same handle.
/// Handles come from a monotonic counter and are never reused, so a
/// registry serves at most `max_threads` threads over the whole life of
/// the process.
pub struct Registry {
    id: u64,
    max_threads: usize,
    next: CachePadded<AtomicUsize>,
}

impl Registry {
    /// Creates a registry admitting `max_threads` threads.
    ///
    /// Every thread caches its handle in a thread-local map keyed by
    /// registry, and entries are only freed when the thread exits. A
    /// long-lived thread registering with many short-lived registries
    /// keeps one entry per registry, so registries are meant to be
    /// created once per subsystem rather than on demand.
    pub fn new(max_threads: usize) -> Arc<Self> {
        assert!(max_threads > 0, "a registry must admit at least one thread");
        Arc::new(Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            max_threads,
            next: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// The registry used by domains that are not given one explicitly.
    pub fn global() -> &'static Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Registry::new(DEFAULT_MAX_THREADS))
    }

    /// Returns the calling thread's handle, assigning one on first use.
    ///
    /// # Panics
    ///
    /// Panics if the registry already handed out `max_threads` handles.
    pub fn register(&self) -> ThreadHandle {
        match self.try_register() {
            Ok(handle) => handle,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_register(&self) -> Result<ThreadHandle, Error> {
        HANDLES.with(|handles| {
            let mut handles = handles.borrow_mut();
            if let Some(&index) = handles.get(&self.id) {
                return Ok(ThreadHandle::new(self.id, index));
            }

            let index = self.next.fetch_add(1, Ordering::Relaxed);
            if index >= self.max_threads {
                return Err(Error::ThreadsExhausted {
                    max_threads: self.max_threads,
                });
            }
            handles.insert(self.id, index);
            trace!(
                "registry {}: {:?} registered as thread {}",
                self.id,
                std::thread::current().id(),
                index
            );
            Ok(ThreadHandle::new(self.id, index))
        })
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Number of handles handed out so far.
    pub fn registered(&self) -> usize {
        self.next.load(Ordering::Relaxed).min(self.max_threads)
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

/// The calling thread's identity in a [`Registry`].
///
/// A capability passed to every per-thread operation of a
/// [`Domain`](crate::Domain). It is neither `Send` nor `Sync`, so it
/// never reaches a thread other than the one it was issued to, which is
/// what makes each row of a domain single-writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadHandle {
    registry: u64,
    index: usize,
    _marker: PhantomData<*const ()>,
}

assert_not_impl_any!(ThreadHandle: Send, Sync);

impl ThreadHandle {
    fn new(registry: u64, index: usize) -> Self {
        Self {
            registry,
            index,
            _marker: PhantomData,
        }
    }

    /// Index in `0..max_threads` of the issuing registry.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn registry(&self) -> u64 {
        self.registry
    }
}
