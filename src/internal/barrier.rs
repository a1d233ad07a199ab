//! Asymmetric fences between readers publishing hazards and the thread
//! scanning them.
//!
//! The reader side is on every `protect` and stays a compiler fence
//! where the kernel supports `membarrier(2)`; the scanning side pays for
//! a process-wide barrier once per scan.

cfg_if::cfg_if! {
    if #[cfg(miri)] {
        use core::sync::atomic::{fence, Ordering};

        #[inline(always)]
        pub(crate) fn light() {
            fence(Ordering::SeqCst);
        }

        #[inline(always)]
        pub(crate) fn heavy() {
            fence(Ordering::SeqCst);
        }
    } else {
        #[inline(always)]
        pub(crate) fn light() {
            membarrier::light();
        }

        #[inline(always)]
        pub(crate) fn heavy() {
            membarrier::heavy();
        }
    }
}
