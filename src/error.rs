use std::fmt;

/// Capacity violations of the reclamation engine.
///
/// Every one of these is a programming-contract violation: a correct
/// deployment never reaches them. The asserting entry points panic with
/// the `Display` text of the matching variant; [`Registry::try_register`]
/// hands it back instead.
///
/// [`Registry::try_register`]: crate::Registry::try_register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// More threads registered than the registry was sized for.
    ThreadsExhausted { max_threads: usize },
    /// A thread retired into a retire list that was already full.
    RetireListFull { capacity: usize },
    /// A hazard slot index outside `0..slots_per_thread`.
    SlotOutOfRange { slot: usize, slots_per_thread: usize },
    /// A handle issued by another registry was presented to a domain.
    ForeignHandle,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::ThreadsExhausted { max_threads } => {
                write!(f, "more than {} threads registered", max_threads)
            }
            Error::RetireListFull { capacity } => {
                write!(f, "retire list full ({} objects pending)", capacity)
            }
            Error::SlotOutOfRange {
                slot,
                slots_per_thread,
            } => write!(
                f,
                "hazard slot {} out of range (domain has {} per thread)",
                slot, slots_per_thread
            ),
            Error::ForeignHandle => f.write_str("thread handle belongs to another registry"),
        }
    }
}

impl std::error::Error for Error {}
