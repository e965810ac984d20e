//! LSF integration for drover.
//!
//! Submit via bsub, query via bjobs, cancel via bkill.

pub mod backend;
pub mod bjobs;
pub mod bkill;
pub mod bsub;
pub mod types;

pub use backend::LsfBackend;
pub use types::LsfJobState;
