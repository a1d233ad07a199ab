use std::mem;

use atomic::{Atomic, Ordering};
use static_assertions::const_assert;

use crate::shared_ptr::{Owned, Shared};

/// An atomic pointer slot inside a concurrent structure.
///
/// This is the source a reader hands to [`Domain::protect`]. The link
/// does not own what it points to: objects unlinked from it are handed
/// to [`Domain::retire`], and whatever is still linked when the
/// structure is torn down must be freed by the structure itself.
///
/// [`Domain::protect`]: crate::Domain::protect
/// [`Domain::retire`]: crate::Domain::retire
pub struct AtomicLink<T> {
    link: Atomic<Shared<T>>,
}

unsafe impl<T: Send + Sync> Send for AtomicLink<T> {}
unsafe impl<T: Send + Sync> Sync for AtomicLink<T> {}

// Ensure that Shared<T> is pointer-sized,
// so that lock-free atomic operations are possible.
const_assert!(Atomic::<Shared<u8>>::is_lock_free());
const_assert!(mem::size_of::<Shared<u8>>() == mem::size_of::<*mut u8>());

impl<T> Default for AtomicLink<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Shared<T>> for AtomicLink<T> {
    fn from(ptr: Shared<T>) -> Self {
        Self {
            link: Atomic::new(ptr),
        }
    }
}

impl<T> AtomicLink<T> {
    pub fn null() -> Self {
        Self::from(Shared::null())
    }

    /// Allocates `value` and links it.
    pub fn new(value: T) -> Self {
        Self::from(Owned::new(value).into_shared())
    }

    /// Reads the link without protecting the result.
    ///
    /// The returned pointer may only be compared or tagged; dereferencing
    /// it requires protecting it first.
    #[inline(always)]
    pub fn load(&self, order: Ordering) -> Shared<T> {
        self.link.load(order)
    }

    #[inline(always)]
    pub fn store(&self, ptr: Shared<T>, order: Ordering) {
        self.link.store(ptr, order)
    }

    /// Replaces the link, returning what was unlinked.
    #[inline(always)]
    pub fn swap(&self, ptr: Shared<T>, order: Ordering) -> Shared<T> {
        self.link.swap(ptr, order)
    }

    /// On success returns the previous value, which equals `current`. On
    /// failure returns the value actually found.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: Shared<T>,
        new: Shared<T>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Shared<T>, Shared<T>> {
        self.link.compare_exchange(current, new, success, failure)
    }

    #[inline(always)]
    pub fn compare_exchange_weak(
        &self,
        current: Shared<T>,
        new: Shared<T>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Shared<T>, Shared<T>> {
        self.link.compare_exchange_weak(current, new, success, failure)
    }

    pub fn into_inner(self) -> Shared<T> {
        self.link.into_inner()
    }
}
