use core::fmt;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr;

/// A tagged pointer to an object managed by a [`Domain`].
///
/// `Shared` is what lock-free structures store in an [`AtomicLink`] and
/// what the domain hands back from `protect`. It never exposes the
/// address it wraps. The unused low bits of an aligned pointer may
/// carry a tag (e.g. a logical deletion mark); hazard slots and retire
/// lists only ever see the untagged identity.
///
/// Dereferencing is `unsafe`: the object is only guaranteed to be alive
/// while one of the calling thread's hazard slots holds it.
///
/// [`Domain`]: crate::Domain
/// [`AtomicLink`]: crate::AtomicLink
pub struct Shared<T> {
    ptr: *mut T,
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Shared<T> {}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for Shared<T> {}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("null", &self.is_null())
            .field("tag", &self.tag())
            .finish()
    }
}

impl<T> Shared<T> {
    pub(crate) fn from_raw(ptr: *mut T) -> Self {
        Self { ptr }
    }

    pub const fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.untagged_raw().is_null()
    }

    pub fn tag(&self) -> usize {
        let ptr = self.ptr as usize;
        ptr & low_bits::<T>()
    }

    /// Returns the same pointer with the tag replaced by `tag`.
    /// Bits that do not fit the alignment of `T` are dropped.
    pub fn with_tag(&self, tag: usize) -> Self {
        Self::from_raw(with_tag(self.ptr, tag))
    }

    pub fn untagged(&self) -> Self {
        self.with_tag(0)
    }

    pub(crate) fn untagged_raw(&self) -> *mut T {
        let ptr = self.ptr as usize;
        (ptr & !low_bits::<T>()) as *mut T
    }

    /// Identity published in hazard slots and compared during scans.
    pub(crate) fn identity(&self) -> usize {
        self.untagged_raw() as usize
    }

    /// # Safety
    ///
    /// The object must be protected by one of the calling thread's
    /// hazard slots (or otherwise unreachable by reclaimers) for as long
    /// as the returned reference is used.
    pub unsafe fn as_ref<'g>(&self) -> Option<&'g T> {
        self.untagged_raw().as_ref()
    }

    /// # Safety
    ///
    /// Same as [`Shared::as_ref`], and the pointer must not be null.
    pub unsafe fn deref<'g>(&self) -> &'g T {
        &*self.untagged_raw()
    }

    /// Takes ownership of the object back.
    ///
    /// # Safety
    ///
    /// The pointer must be non-null, must come from [`Owned::into_shared`],
    /// must not be reachable by any other thread, and must not have been
    /// retired.
    pub unsafe fn into_owned(self) -> Owned<T> {
        Owned {
            inner: Box::from_raw(self.untagged_raw()),
        }
    }
}

/// An object not yet shared with other threads.
pub struct Owned<T> {
    inner: Box<T>,
}

impl<T> Owned<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Box::new(value),
        }
    }

    /// Gives up ownership so the object can be linked into a concurrent
    /// structure. From here on it must be freed through
    /// [`Domain::retire`](crate::Domain::retire).
    pub fn into_shared(self) -> Shared<T> {
        Shared::from_raw(Box::into_raw(self.inner))
    }
}

impl<T> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Owned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.inner).finish()
    }
}

/// Returns a bitmask containing the unused least significant bits of an aligned pointer to `T`.
#[inline]
const fn low_bits<T>() -> usize {
    (1 << mem::align_of::<T>().trailing_zeros()) - 1
}

/// Returns the pointer with the given tag
#[inline]
fn with_tag<T>(ptr: *mut T, tag: usize) -> *mut T {
    ((ptr as usize & !low_bits::<T>()) | (tag & low_bits::<T>())) as *mut T
}
