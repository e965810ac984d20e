//! SLURM integration for drover.
//!
//! Submit via sbatch, query via scontrol, cancel via scancel.

pub mod backend;
pub mod sbatch;
pub mod scancel;
pub mod scontrol;
pub mod types;

pub use backend::SlurmBackend;
pub use types::SlurmJobState;
