//! Hazard-pointer based safe memory reclamation.
//!
//! Threads reading from lock-free structures publish the objects they
//! inspect in per-thread hazard slots of a [`Domain`]; threads unlinking
//! objects retire them to the domain, which reclaims an object only once
//! no slot holds it.
//!
//! ```
//! use hp_reclaim::{AtomicLink, Config, Domain, Owned};
//! use std::sync::atomic::Ordering;
//!
//! let domain = Domain::new(Config::default());
//! let handle = domain.register();
//! let link = AtomicLink::new(1u32);
//!
//! let current = domain.protect(handle, 0, &link);
//! assert_eq!(unsafe { *current.deref() }, 1);
//!
//! let old = link.swap(Owned::new(2).into_shared(), Ordering::AcqRel);
//! unsafe { domain.retire(handle, old) };
//! // Still protected by our own slot.
//! assert_eq!(domain.pending(handle), 1);
//!
//! domain.clear(handle, 0);
//! domain.scan(handle);
//! assert_eq!(domain.pending(handle), 0);
//! # unsafe { drop(link.into_inner().into_owned()) };
//! ```
mod atomic_link;
mod config;
mod domain;
mod error;
mod internal;
mod shared_ptr;

pub use atomic_link::AtomicLink;
pub use config::{Config, DEFAULT_MAX_THREADS, DEFAULT_SCAN_THRESHOLD, DEFAULT_SLOTS_PER_THREAD};
pub use domain::{Domain, Reclaim};
pub use error::Error;
pub use internal::{Registry, ThreadHandle};
pub use shared_ptr::{Owned, Shared};
