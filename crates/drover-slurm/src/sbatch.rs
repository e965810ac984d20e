//! Submit batch jobs via sbatch.

use camino::Utf8Path;
use drover_core::{
    BackendError, JobId, JobSpec, ScriptFile, ScriptSettings, Submitted, expand_log_path,
    render_script,
};
use drover_parsers::{capture_command, format_duration_slurm, format_memory_slurm};
use tokio::process::Command;

/// SLURM directive block for a job.
pub fn directives(spec: &JobSpec, log: &Utf8Path, mail_user: Option<&str>) -> Vec<String> {
    let resources = &spec.resources;
    let mut lines = vec![
        format!("#SBATCH -J {}", spec.job_name()),
        "#SBATCH -n 1".to_string(),
        "#SBATCH --ntasks-per-node=1".to_string(),
        format!("#SBATCH -p {}", resources.partition),
        format!("#SBATCH -A {}", resources.account),
        format!(
            "#SBATCH -t {}",
            format_duration_slurm(resources.time_limit.as_secs())
        ),
        format!("#SBATCH --mem={}", format_memory_slurm(resources.memory_mb)),
        format!("#SBATCH -e {}", log),
        format!("#SBATCH -o {}", log),
    ];

    if let Some(constraint) = &resources.constraint {
        lines.push(format!("#SBATCH -C {}", constraint));
    }

    if spec.notify {
        lines.push("#SBATCH --mail-type=ALL".to_string());
        if let Some(user) = mail_user {
            lines.push(format!("#SBATCH --mail-user={}", user));
        }
    }

    if !spec.dependencies.is_empty() {
        let ids: Vec<&str> = spec.dependencies.iter().map(JobId::as_str).collect();
        lines.push(format!("#SBATCH -d afterok:{}", ids.join(":")));
    }

    lines
}

/// Job id from sbatch output: the last word of the last line.
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.split_whitespace().last())
        .map(JobId::from)
}

/// Write the batch script for `spec` and submit it.
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

    let mut cmd = Command::new("sbatch");
    cmd.arg(script.path());
    let output = capture_command(&mut cmd, "sbatch").await?;

    if !output.success() {
        return Err(BackendError::Submit {
            command: format!("sbatch {}", script.path()),
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    let id = parse_job_id(&output.stdout).ok_or_else(|| BackendError::MissingJobId {
        command: format!("sbatch {}", script.path()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use drover_core::{EnvBootstrap, Resources};
    use std::time::Duration;

    fn spec() -> JobSpec {
        JobSpec {
            commands: vec![vec!["calc.py".to_string(), "blob".to_string()]],
            resources: Resources {
                partition: "dav".to_string(),
                account: "NCGD0011".to_string(),
                time_limit: Duration::from_secs(86400),
                memory_mb: 30720,
                constraint: None,
            },
            env: EnvBootstrap::default(),
            dependencies: Vec::new(),
            notify: false,
            name: None,
        }
    }

    #[test]
    fn test_directives_basic() {
        let log = Utf8Path::new("/logs/drover.calc.x.%J.out");
        let lines = directives(&spec(), log, None);
        assert_eq!(
            lines,
            vec![
                "#SBATCH -J calc.py",
                "#SBATCH -n 1",
                "#SBATCH --ntasks-per-node=1",
                "#SBATCH -p dav",
                "#SBATCH -A NCGD0011",
                "#SBATCH -t 1-00:00:00",
                "#SBATCH --mem=30720M",
                "#SBATCH -e /logs/drover.calc.x.%J.out",
                "#SBATCH -o /logs/drover.calc.x.%J.out",
            ]
        );
    }

    #[test]
    fn test_directives_optional_lines() {
        let mut spec = spec();
        spec.resources.constraint = Some("casper".to_string());
        spec.notify = true;
        spec.dependencies = vec![JobId::from("101"), JobId::from("102")];

        let lines = directives(&spec, Utf8Path::new("/logs/x.out"), Some("me@example.org"));
        assert!(lines.contains(&"#SBATCH -C casper".to_string()));
        assert!(lines.contains(&"#SBATCH --mail-type=ALL".to_string()));
        assert!(lines.contains(&"#SBATCH --mail-user=me@example.org".to_string()));
        assert_eq!(lines.last().unwrap(), "#SBATCH -d afterok:101:102");
    }

    #[test]
    fn test_no_dependency_directive_without_dependencies() {
        let lines = directives(&spec(), Utf8Path::new("/logs/x.out"), None);
        assert!(!lines.iter().any(|l| l.starts_with("#SBATCH -d")));
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(
            parse_job_id("Submitted batch job 4242\n"),
            Some(JobId::from("4242"))
        );
        assert_eq!(
            parse_job_id("sbatch: note: using default qos\nSubmitted batch job 77\n\n"),
            Some(JobId::from("77"))
        );
        assert_eq!(parse_job_id(""), None);
    }
}
