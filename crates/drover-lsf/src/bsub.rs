//! Submit batch jobs via bsub.

use camino::Utf8Path;
use drover_core::{
    BackendError, JobId, JobSpec, ScriptFile, ScriptSettings, Submitted, expand_log_path,
    render_script,
};
use drover_parsers::{capture_command, format_duration_lsf, format_memory_lsf};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use tokio::process::Command;

/// "Job <12345> is submitted to queue <normal>."
static SUBMITTED_JOB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Job <(\d+)>").expect("bsub id pattern is valid"));

/// LSF directive block for a job.
pub fn directives(spec: &JobSpec, log: &Utf8Path, mail_user: Option<&str>) -> Vec<String> {
    let resources = &spec.resources;
    let mut lines = vec![
        format!("#BSUB -J {}", spec.job_name()),
        "#BSUB -n 1".to_string(),
        format!("#BSUB -q {}", resources.partition),
        format!("#BSUB -P {}", resources.account),
        format!(
            "#BSUB -W {}",
            format_duration_lsf(resources.time_limit.as_secs())
        ),
        format!("#BSUB -M {}", format_memory_lsf(resources.memory_mb)),
        format!("#BSUB -e {}", log),
        format!("#BSUB -o {}", log),
    ];

    if let Some(constraint) = &resources.constraint {
        lines.push(format!("#BSUB -R \"select[{}]\"", constraint));
    }

    if spec.notify {
        lines.push("#BSUB -N".to_string());
        if let Some(user) = mail_user {
            lines.push(format!("#BSUB -u {}", user));
        }
    }

    if !spec.dependencies.is_empty() {
        let terms: Vec<String> = spec
            .dependencies
            .iter()
            .map(|id| format!("done({})", id))
            .collect();
        lines.push(format!("#BSUB -w \"{}\"", terms.join(" && ")));
    }

    lines
}

/// Job id from bsub output.
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    SUBMITTED_JOB
        .captures(stdout)
        .map(|caps| JobId::from(&caps[1]))
}

/// Write the batch script for `spec` and feed it to bsub.
pub async fn submit(spec: &JobSpec, settings: &ScriptSettings) -> Result<Submitted, BackendError> {
    let script = ScriptFile::create(&settings.log_dir)?;
    let log = script.log_template();

    let contents = render_script(
        &directives(spec, &log, settings.mail_user.as_deref()),
        &spec.env,
        settings,
        &spec.command_lines(),
    );
    script.write(&contents)?;

    // bsub only reads #BSUB directives from a script given on stdin
    let mut cmd = Command::new("bsub");
    cmd.stdin(File::open(script.path())?);
    let output = capture_command(&mut cmd, "bsub").await?;

    if !output.success() {
        return Err(BackendError::Submit {
            command: format!("bsub < {}", script.path()),
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    let id = parse_job_id(&output.stdout).ok_or_else(|| BackendError::MissingJobId {
        command: format!("bsub < {}", script.path()),
        stdout: output.stdout.clone(),
        stderr: output.stderr.clone(),
    })?;

    let log_path = expand_log_path(&log, id.as_str());
    Ok(Submitted {
        id,
        script_path: Some(script.path().to_owned()),
        log_path: Some(log_path),
    })
}
