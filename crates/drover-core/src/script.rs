//! Batch script layout shared by the queueing backends.
//!
//! A script is the backend's directive block, an environment reset and
//! bootstrap prologue, the command stages, and a final exit-code line.

use crate::types::EnvBootstrap;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;

/// Prefix for batch script and log file names.
pub const JOB_FILE_PREFIX: &str = "drover.calc";

/// Placeholder both SLURM and LSF expand to the job id in output paths.
pub const JOB_ID_PLACEHOLDER: &str = "%J";

/// Module state inherited from the submitting shell that the prologue clears.
const MODULE_VARS: &[&str] = &["MODULEPATH_ROOT", "MODULEPATH", "LMOD_SYSTEM_DEFAULT_MODULES"];

/// Where scripts and logs go, plus values captured from the submitting environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSettings {
    /// Directory for batch scripts and job logs
    pub log_dir: Utf8PathBuf,
    /// TMPDIR exported inside jobs
    pub tmp_dir: Utf8PathBuf,
    /// Recipient for job notifications
    pub mail_user: Option<String>,
    pub term: Option<String>,
    pub home: Option<String>,
}

/// A batch script file reserved in the log directory.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    path: Utf8PathBuf,
}

impl ScriptFile {
    /// Reserve a uniquely named `.run` file in `dir`.
    pub fn create(dir: &Utf8Path) -> io::Result<Self> {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let (_, path) = tempfile::Builder::new()
            .prefix(&format!("{}.{}.", JOB_FILE_PREFIX, stamp))
            .suffix(".run")
            .tempfile_in(dir)?
            .keep()?;
        let path = Utf8PathBuf::try_from(path).map_err(|e| e.into_io_error())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Log path with the job id placeholder left in for the scheduler to expand.
    pub fn log_template(&self) -> Utf8PathBuf {
        let path = self.path.as_str();
        let stem = path.strip_suffix(".run").unwrap_or(path);
        Utf8PathBuf::from(format!("{}.{}.out", stem, JOB_ID_PLACEHOLDER))
    }

    /// Write the script and make it executable.
    pub fn write(&self, contents: &str) -> io::Result<()> {
        fs::write(&self.path, contents)?;
        let mut perms = fs::metadata(&self.path)?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(&self.path, perms)
    }
}

/// Substitute a job id into a log template.
pub fn expand_log_path(template: &Utf8Path, id: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(template.as_str().replace(JOB_ID_PLACEHOLDER, id))
}

/// Find the newest log file written for job `id` in `log_dir`.
///
/// Log names embed the submission timestamp, so the lexically greatest
/// match is the most recent.
pub fn find_job_log(log_dir: &Utf8Path, id: &str) -> io::Result<Option<Utf8PathBuf>> {
    let suffix = format!(".{}.out", id);
    let mut latest: Option<Utf8PathBuf> = None;

    for entry in log_dir.read_dir_utf8()? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.starts_with(JOB_FILE_PREFIX) || !name.ends_with(&suffix) {
            continue;
        }
        if latest.as_ref().is_none_or(|best| best.file_name() < Some(name)) {
            latest = Some(entry.path().to_owned());
        }
    }

    Ok(latest)
}

/// Render a complete batch script.
pub fn render_script(
    directives: &[String],
    env: &EnvBootstrap,
    settings: &ScriptSettings,
    commands: &[String],
) -> String {
    let mut lines = vec!["#!/bin/bash".to_string()];
    lines.extend(directives.iter().cloned());
    lines.extend(prologue(env, settings));
    lines.extend(commands.iter().cloned());
    lines.push("exit ${?}".to_string());

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

fn prologue(env: &EnvBootstrap, settings: &ScriptSettings) -> Vec<String> {
    let mut lines = vec![
        format!("unset {}", MODULE_VARS.join(" ")),
        "source /etc/profile".to_string(),
    ];

    if let Some(term) = &settings.term {
        lines.push(format!("export TERM={}", term));
    }
    if let Some(home) = &settings.home {
        lines.push(format!("export HOME={}", home));
    }
    if !env.unset_vars.is_empty() {
        lines.push(format!("unset {}", env.unset_vars.join(" ")));
    }
    if let Some(conda_path) = &env.conda_path {
        lines.push(format!("export PATH={}:$PATH", conda_path));
    }
    lines.push("export PYTHONUNBUFFERED=1".to_string());
    lines.push(format!("export TMPDIR={}", settings.tmp_dir));

    if env.module_purge {
        lines.push("module purge".to_string());
    }
    if !env.modules.is_empty() {
        for module in &env.modules {
            lines.push(format!("module load {}", module));
        }
        lines.push("module list".to_string());
    }
    if let Some(conda_env) = &env.conda_env {
        lines.push(format!("source activate {}", conda_env));
    }

    lines
}
