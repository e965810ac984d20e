//! Job tracking and orchestration for drover.
//!
//! A [`TaskManager`] submits jobs through one [`drover_core::Backend`],
//! bounds how many are in flight, waits for them, cascades cancellation
//! when a dependency fails and turns failures or an exhausted time budget
//! into a [`Termination`].

pub mod escalation;
pub mod local;
pub mod manager;
pub mod registry;
pub mod waiter;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use escalation::{Outcome, Termination};
pub use local::LocalBackend;
pub use manager::TaskManager;
pub use registry::{Registry, TrackedJob};
pub use waiter::WaitReport;
