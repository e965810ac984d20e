//! Orchestrator configuration.
//!
//! Raw settings come from an optional JSON file, then environment
//! variables, then command-line flags. [`DroverConfig::validate`] turns them
//! into typed [`Settings`] once, at startup.

use crate::backend::BackendKind;
use crate::script::ScriptSettings;
use crate::types::{EnvBootstrap, JobDefaults, Resources};
use camino::{Utf8Path, Utf8PathBuf};
use drover_parsers::{parse_duration, parse_memory_mb};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {error}")]
    Io {
        path: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error("JSON error in {path}: {error}")]
    Json {
        path: Utf8PathBuf,
        error: serde_json::Error,
    },
    #[error("Invalid memory size: {0}")]
    Memory(String),
    #[error("Invalid time limit: {0}")]
    TimeLimit(String),
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Raw, user-facing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DroverConfig {
    /// Queueing system; auto-detected when unset
    pub backend: Option<BackendKind>,
    pub account: String,
    pub partition: String,
    /// Wall-time limit, e.g. "24:00:00"
    pub time_limit: String,
    /// Memory request, e.g. "100GB"
    pub memory: String,
    pub constraint: Option<String>,
    pub conda_env: Option<String>,
    pub conda_path: Option<String>,
    pub modules: Vec<String>,
    pub module_purge: bool,
    pub unset_vars: Vec<String>,
    pub mail_user: Option<String>,
    /// Root for the log and job TMPDIR directories
    pub scratch_dir: Utf8PathBuf,
    /// Registry size at which submission drains before admitting more
    pub max_jobs: usize,
    /// Wall-clock budget before asking the driver to resubmit
    pub max_runtime_hours: f64,
    pub poll_interval_secs: f64,
    pub transitional_retries: u32,
    pub transitional_delay_ms: u64,
}

impl Default for DroverConfig {
    fn default() -> Self {
        Self {
            backend: None,
            account: String::new(),
            partition: "dav".to_string(),
            time_limit: "24:00:00".to_string(),
            memory: "100GB".to_string(),
            constraint: None,
            conda_env: None,
            conda_path: None,
            modules: Vec::new(),
            module_purge: false,
            unset_vars: vec!["LD_LIBRARY_PATH".to_string()],
            mail_user: None,
            scratch_dir: default_scratch_dir(),
            max_jobs: 400,
            max_runtime_hours: 20.0,
            poll_interval_secs: 1.0,
            transitional_retries: 100,
            transitional_delay_ms: 500,
        }
    }
}

fn default_scratch_dir() -> Utf8PathBuf {
    if let Ok(scratch) = std::env::var("SCRATCH") {
        return Utf8PathBuf::from(scratch);
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "drover".to_string());
    let tmp = Utf8PathBuf::try_from(std::env::temp_dir()).unwrap_or_else(|_| "/tmp".into());
    tmp.join(user)
}

/// Limits governing the waiter and admission control.
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub max_jobs: usize,
    pub max_runtime: Duration,
    pub poll_interval: Duration,
    pub transitional_retries: u32,
    pub transitional_delay: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_jobs: 400,
            max_runtime: Duration::from_secs(20 * 3600),
            poll_interval: Duration::from_secs(1),
            transitional_retries: 100,
            transitional_delay: Duration::from_millis(500),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Option<BackendKind>,
    pub limits: Limits,
    pub defaults: JobDefaults,
    pub script: ScriptSettings,
}

impl DroverConfig {
    /// Load from an optional JSON file and apply environment overrides.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Read a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_owned(),
            error,
        })?;
        serde_json::from_str(&content).map_err(|error| ConfigError::Json {
            path: path.to_owned(),
            error,
        })
    }

    /// Apply `DROVER_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(account) = std::env::var("DROVER_ACCOUNT") {
            self.account = account;
        }
        if let Ok(backend) = std::env::var("DROVER_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.backend = Some(kind),
                Err(e) => tracing::warn!("Ignoring DROVER_BACKEND: {}", e),
            }
        }
        if let Ok(env) = std::env::var("DROVER_CONDA_ENV") {
            self.conda_env = Some(env);
        }
        if let Ok(path) = std::env::var("DROVER_CONDA_PATH") {
            self.conda_path = Some(path);
        }
        if let Ok(mail) = std::env::var("DROVER_MAIL_USER") {
            self.mail_user = Some(mail);
        }
        if let Ok(scratch) = std::env::var("DROVER_SCRATCH") {
            self.scratch_dir = Utf8PathBuf::from(scratch);
        }
    }

    pub fn log_dir(&self) -> Utf8PathBuf {
        self.scratch_dir.join("drover")
    }

    pub fn tmp_dir(&self) -> Utf8PathBuf {
        self.scratch_dir.join("tmp")
    }

    /// Check every field and build typed settings.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let memory_mb =
            parse_memory_mb(&self.memory).ok_or_else(|| ConfigError::Memory(self.memory.clone()))?;
        let time_limit = parse_duration(&self.time_limit)
            .ok_or_else(|| ConfigError::TimeLimit(self.time_limit.clone()))?;

        if self.max_jobs == 0 {
            return Err(ConfigError::Invalid {
                name: "max_jobs",
                reason: "must be at least 1".to_string(),
            });
        }
        let max_runtime = non_negative_secs("max_runtime_hours", self.max_runtime_hours * 3600.0)?;
        let poll_interval = non_negative_secs("poll_interval_secs", self.poll_interval_secs)?;

        Ok(Settings {
            backend: self.backend,
            limits: Limits {
                max_jobs: self.max_jobs,
                max_runtime,
                poll_interval,
                transitional_retries: self.transitional_retries,
                transitional_delay: Duration::from_millis(self.transitional_delay_ms),
            },
            defaults: JobDefaults {
                resources: Resources {
                    partition: self.partition.clone(),
                    account: self.account.clone(),
                    time_limit,
                    memory_mb,
                    constraint: self.constraint.clone(),
                },
                env: EnvBootstrap {
                    module_purge: self.module_purge,
                    modules: self.modules.clone(),
                    conda_env: self.conda_env.clone(),
                    conda_path: self.conda_path.clone(),
                    unset_vars: self.unset_vars.clone(),
                },
            },
            script: ScriptSettings {
                log_dir: self.log_dir(),
                tmp_dir: self.tmp_dir(),
                mail_user: self.mail_user.clone(),
                term: std::env::var("TERM").ok(),
                home: std::env::var("HOME").ok(),
            },
        })
    }
}

fn non_negative_secs(name: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{} is not a non-negative number", secs),
        });
    }
    Ok(Duration::from_secs_f64(secs))
}
