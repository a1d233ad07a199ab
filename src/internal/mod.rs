mod barrier;
mod hazard;
mod registry;
mod retire;

pub(crate) use barrier::{heavy, light};
pub(crate) use hazard::HazardRow;
pub use registry::{Registry, ThreadHandle};
pub(crate) use retire::RetireList;
