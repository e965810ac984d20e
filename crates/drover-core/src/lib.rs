//! Core types for drover.
//!
//! Job specifications, statuses, the backend capability trait, batch
//! script layout, configuration and parameter blobs.

pub mod backend;
pub mod config;
pub mod params;
pub mod script;
pub mod types;

pub use backend::{Backend, BackendError, BackendKind};
pub use config::{ConfigError, DroverConfig, Limits, Settings};
pub use params::{Params, ParamsError, decode_params, encode_params, read_params, resolve_params};
pub use script::{
    JOB_FILE_PREFIX, ScriptFile, ScriptSettings, expand_log_path, find_job_log, render_script,
};
pub use types::{
    EnvBootstrap, JobDefaults, JobId, JobSpec, Resources, Status, SubmitOptions, Submitted,
};
