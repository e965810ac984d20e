//! CLI argument parsing for drover.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use drover_core::{BackendKind, JobId, Params, SubmitOptions};
use drover_parsers::{parse_duration, parse_memory_mb};
use serde_json::Value;
use thiserror::Error;

/// Word separating command stages on the `submit` command line.
pub const STAGE_SEPARATOR: &str = ";";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("Invalid memory size: {0}")]
    Memory(String),
    #[error("Invalid time limit: {0}")]
    TimeLimit(String),
    #[error("Expected key=value, got {0:?}")]
    Param(String),
    #[error("No command given")]
    EmptyCommand,
}

#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(version)]
#[command(about = "Submit, track and sequence batch jobs on SLURM, LSF or the local shell")]
pub struct Args {
    /// JSON configuration file (falls back to DROVER_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Queueing system; defaults to the configured one, else auto-detected
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendChoice>,

    /// Tracked job count that triggers a drain before submitting more
    #[arg(long, global = true)]
    pub max_jobs: Option<usize>,

    /// Time budget in hours before exiting with code 43
    #[arg(long, global = true)]
    pub max_hours: Option<f64>,

    /// Seconds between status polls
    #[arg(long, global = true)]
    pub poll_interval: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    Auto,
    Slurm,
    Lsf,
    Local,
}

impl BackendChoice {
    /// The explicit backend, or `None` for auto-detection.
    pub fn kind(self) -> Option<BackendKind> {
        match self {
            Self::Auto => None,
            Self::Slurm => Some(BackendKind::Slurm),
            Self::Lsf => Some(BackendKind::Lsf),
            Self::Local => Some(BackendKind::Local),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a job and print its id
    Submit(SubmitArgs),

    /// Print the status of a job
    Status {
        id: String,
    },

    /// Wait for jobs to finish
    Wait {
        /// Job ids
        ids: Vec<String>,
    },

    /// Cancel a job
    Kill {
        id: String,
    },

    /// Print the newest log file of a job
    Peek {
        id: String,
    },

    /// Run a script over time chunks and join the results
    Chunks(ChunksArgs),

    /// Decode a parameter blob and print it as JSON
    Params {
        blob: String,

        /// Treat BLOB as a path to a file holding the blob
        #[arg(long)]
        file: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Job name (defaults to the first word of the command)
    #[arg(long)]
    pub name: Option<String>,

    /// Partition (SLURM) or queue (LSF)
    #[arg(long)]
    pub partition: Option<String>,

    #[arg(long)]
    pub account: Option<String>,

    /// Wall-time limit, e.g. 24:00:00
    #[arg(long)]
    pub time_limit: Option<String>,

    /// Memory request, e.g. 30GB
    #[arg(long)]
    pub memory: Option<String>,

    /// Hardware constraint
    #[arg(long)]
    pub constraint: Option<String>,

    /// Module to load (repeatable)
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Job that must succeed first (repeatable)
    #[arg(long = "depend")]
    pub dependencies: Vec<String>,

    /// Mail on job events
    #[arg(long)]
    pub notify: bool,

    /// Command; separate stages with a lone `;`
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

impl SubmitArgs {
    /// Command stages, split on the stage separator.
    pub fn stages(&self) -> Result<Vec<Vec<String>>, CliError> {
        let stages: Vec<Vec<String>> = self
            .command
            .split(|word| word == STAGE_SEPARATOR)
            .filter(|stage| !stage.is_empty())
            .map(<[String]>::to_vec)
            .collect();

        if stages.is_empty() {
            return Err(CliError::EmptyCommand);
        }
        Ok(stages)
    }

    pub fn options(&self) -> Result<SubmitOptions, CliError> {
        Ok(SubmitOptions {
            name: self.name.clone(),
            partition: self.partition.clone(),
            account: self.account.clone(),
            time_limit: self.time_limit.as_deref().map(time_limit).transpose()?,
            memory_mb: self.memory.as_deref().map(memory_mb).transpose()?,
            constraint: self.constraint.clone(),
            modules: (!self.modules.is_empty()).then(|| self.modules.clone()),
            module_purge: None,
            conda_env: None,
            notify: self.notify,
            dependencies: self.dependencies.iter().map(|id| JobId::from(id.as_str())).collect(),
        })
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChunksArgs {
    /// Program run on each chunk as `SCRIPT <parameter blob>`
    #[arg(long)]
    pub script: String,

    /// Input file(s)
    #[arg(long, required = true, num_args = 1..)]
    pub file_in: Vec<String>,

    /// Final joined output
    #[arg(long)]
    pub file_out: String,

    /// Time levels per chunk
    #[arg(long)]
    pub chunk_size: u64,

    /// First time index
    #[arg(long, default_value = "0")]
    pub start: u64,

    /// One past the last time index
    #[arg(long)]
    pub stop: u64,

    /// Extra parameter as key=json (repeatable); non-JSON values are strings
    #[arg(long = "param")]
    pub params: Vec<String>,

    /// Memory per chunk job
    #[arg(long)]
    pub chunk_memory: Option<String>,

    /// Recompute outputs that already exist
    #[arg(long)]
    pub clobber: bool,

    /// Keep intermediate files
    #[arg(long)]
    pub no_cleanup: bool,

    /// Wait for every job before exiting
    #[arg(long)]
    pub wait: bool,
}

impl ChunksArgs {
    /// Parameter object handed to every chunk job.
    pub fn params(&self) -> Result<Params, CliError> {
        let mut params = Params::new();
        for param in &self.params {
            let (key, value) = parse_param(param)?;
            params.insert(key, value);
        }

        let file_in = match self.file_in.as_slice() {
            [single] => Value::String(single.clone()),
            many => Value::from(many.to_vec()),
        };
        params.insert("file_in".to_string(), file_in);
        params.insert("file_out".to_string(), Value::String(self.file_out.clone()));
        Ok(params)
    }

    pub fn chunk_memory_mb(&self) -> Result<Option<u64>, CliError> {
        self.chunk_memory.as_deref().map(memory_mb).transpose()
    }
}

/// Parse `key=json`, keeping the raw text as a string when it is not JSON.
pub fn parse_param(param: &str) -> Result<(String, Value), CliError> {
    let (key, raw) = param
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| CliError::Param(param.to_string()))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn memory_mb(text: &str) -> Result<u64, CliError> {
    parse_memory_mb(text).ok_or_else(|| CliError::Memory(text.to_string()))
}

fn time_limit(text: &str) -> Result<std::time::Duration, CliError> {
    parse_duration(text).ok_or_else(|| CliError::TimeLimit(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_stages_and_options() {
        let args = Args::try_parse_from([
            "drover", "--max-jobs", "10", "submit", "--memory", "30GB", "--module", "nco",
            "--depend", "41", "--depend", "42", "--", "touch", "a", ";", "sleep", "2",
        ])
        .unwrap();
        assert_eq!(args.max_jobs, Some(10));

        let Command::Submit(submit) = args.command else {
            panic!("expected submit");
        };
        assert_eq!(
            submit.stages().unwrap(),
            vec![vec!["touch", "a"], vec!["sleep", "2"]]
        );

        let options = submit.options().unwrap();
        assert_eq!(options.memory_mb, Some(30720));
        assert_eq!(options.modules, Some(vec!["nco".to_string()]));
        assert_eq!(options.dependencies, vec![JobId::from("41"), JobId::from("42")]);
        assert!(options.time_limit.is_none());
    }

    #[test]
    fn test_submit_rejects_bad_memory() {
        let submit = SubmitArgs {
            memory: Some("lots".to_string()),
            command: vec!["ls".to_string()],
            ..Default::default()
        };
        assert_eq!(submit.options().unwrap_err(), CliError::Memory("lots".to_string()));
    }

    #[test]
    fn test_separator_only_is_empty() {
        let submit = SubmitArgs {
            command: vec![";".to_string()],
            ..Default::default()
        };
        assert_eq!(submit.stages().unwrap_err(), CliError::EmptyCommand);
    }

    #[test]
    fn test_backend_flag() {
        let args = Args::try_parse_from(["drover", "status", "7", "--backend", "lsf"]).unwrap();
        assert_eq!(args.backend.and_then(BackendChoice::kind), Some(BackendKind::Lsf));

        let args = Args::try_parse_from(["drover", "--backend", "auto", "wait"]).unwrap();
        assert_eq!(args.backend.and_then(BackendChoice::kind), None);
    }

    #[test]
    fn test_chunks_params() {
        let args = Args::try_parse_from([
            "drover", "chunks", "--script", "calc.py", "--file-in", "a.nc", "b.nc",
            "--file-out", "out.nc", "--chunk-size", "12", "--stop", "120",
            "--param", "varname=O2", "--param", "depth={\"max\": 200}",
        ])
        .unwrap();

        let Command::Chunks(chunks) = args.command else {
            panic!("expected chunks");
        };
        assert_eq!(chunks.start, 0);
        let params = chunks.params().unwrap();
        assert_eq!(params["file_in"], json!(["a.nc", "b.nc"]));
        assert_eq!(params["file_out"], json!("out.nc"));
        assert_eq!(params["varname"], json!("O2"));
        assert_eq!(params["depth"], json!({"max": 200}));
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=3").is_err());
    }
}
