//! Job, status and resource types shared by every backend.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque backend-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Job status as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Queued, waiting for resources or dependencies
    Pending,
    /// Executing
    Running,
    /// Reported as finishing but not yet settled into Done or Failed
    Transitional,
    /// Finished successfully
    Done,
    /// Failed, timed out, cancelled or killed
    Failed,
    /// The backend no longer knows the id
    Vanished,
    /// State text outside the backend's known mapping
    Unrecognized(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Transitional => f.write_str("TRANSITIONAL"),
            Self::Done => f.write_str("DONE"),
            Self::Failed => f.write_str("FAILED"),
            Self::Vanished => f.write_str("VANISHED"),
            Self::Unrecognized(raw) => write!(f, "UNRECOGNIZED({})", raw),
        }
    }
}

/// Resource request for a batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    /// Partition (SLURM) or queue (LSF)
    pub partition: String,
    pub account: String,
    pub time_limit: Duration,
    pub memory_mb: u64,
    /// Hardware constraint / feature selection
    pub constraint: Option<String>,
}

/// Environment bootstrap emitted into the batch script prologue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvBootstrap {
    pub module_purge: bool,
    pub modules: Vec<String>,
    pub conda_env: Option<String>,
    /// Directory prepended to PATH before activating conda
    pub conda_path: Option<String>,
    /// Variables unset after the profile is sourced
    pub unset_vars: Vec<String>,
}

/// Everything needed to submit one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Command stages; each stage is joined into one script line.
    pub commands: Vec<Vec<String>>,
    pub resources: Resources,
    pub env: EnvBootstrap,
    pub dependencies: Vec<JobId>,
    pub notify: bool,
    pub name: Option<String>,
}

impl JobSpec {
    /// Script lines, one per command stage.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands.iter().map(|stage| stage.join(" ")).collect()
    }

    /// Job name, defaulting to the first word of the first stage.
    pub fn job_name(&self) -> String {
        let explicit = self
            .name
            .as_deref()
            .and_then(|name| name.split_whitespace().next());
        let implicit = self
            .commands
            .first()
            .and_then(|stage| stage.first())
            .and_then(|word| word.split_whitespace().next());

        explicit.or(implicit).unwrap_or("drover").to_string()
    }

    /// The same job with a different dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<JobId>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Per-call overrides on top of the configured job defaults.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub name: Option<String>,
    pub partition: Option<String>,
    pub account: Option<String>,
    pub time_limit: Option<Duration>,
    pub memory_mb: Option<u64>,
    pub constraint: Option<String>,
    pub modules: Option<Vec<String>>,
    pub module_purge: Option<bool>,
    pub conda_env: Option<String>,
    pub notify: bool,
    pub dependencies: Vec<JobId>,
}

/// Configured defaults every submission starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefaults {
    pub resources: Resources,
    pub env: EnvBootstrap,
}

impl JobDefaults {
    /// Build a job spec from the defaults with `options` applied.
    pub fn spec(&self, commands: Vec<Vec<String>>, options: SubmitOptions) -> JobSpec {
        let mut resources = self.resources.clone();
        if let Some(partition) = options.partition {
            resources.partition = partition;
        }
        if let Some(account) = options.account {
            resources.account = account;
        }
        if let Some(time_limit) = options.time_limit {
            resources.time_limit = time_limit;
        }
        if let Some(memory_mb) = options.memory_mb {
            resources.memory_mb = memory_mb;
        }
        if options.constraint.is_some() {
            resources.constraint = options.constraint;
        }

        let mut env = self.env.clone();
        if let Some(modules) = options.modules {
            env.modules = modules;
        }
        if let Some(purge) = options.module_purge {
            env.module_purge = purge;
        }
        if options.conda_env.is_some() {
            env.conda_env = options.conda_env;
        }

        JobSpec {
            commands,
            resources,
            env,
            dependencies: options.dependencies,
            notify: options.notify,
            name: options.name,
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub id: JobId,
    pub script_path: Option<Utf8PathBuf>,
    pub log_path: Option<Utf8PathBuf>,
}
