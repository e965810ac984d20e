//! drover - submit, track and sequence batch jobs.
//!
//! Exit codes: 0 on success, 1 after a hard failure, 43 when the time
//! budget ran out and the caller should resubmit.

mod detect;

use camino::Utf8PathBuf;
use clap::Parser;
use drover_chunks::{ChunkedRun, WorkflowError, apply};
use drover_cli::{Args, ChunksArgs, Command};
use drover_core::{
    Backend, BackendKind, DroverConfig, JobId, Settings, find_job_log, read_params,
};
use drover_lsf::LsfBackend;
use drover_manager::{LocalBackend, Outcome, TaskManager};
use drover_slurm::SlurmBackend;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(&args)?;

    // Commands that never touch a queue
    match &args.command {
        Command::Params { blob, file } => {
            let params = read_params(blob, *file).into_diagnostic()?;
            println!("{}", serde_json::to_string_pretty(&params).into_diagnostic()?);
            return Ok(());
        }
        Command::Peek { id } => return peek(&config, id),
        _ => {}
    }

    let settings = config.validate().into_diagnostic()?;
    std::fs::create_dir_all(&settings.script.log_dir).into_diagnostic()?;
    std::fs::create_dir_all(&settings.script.tmp_dir).into_diagnostic()?;

    let kind = match args.backend {
        Some(choice) => choice.kind(),
        None => settings.backend,
    };
    let kind = match kind {
        Some(kind) => kind,
        None => detect::detect_backend().await,
    };
    tracing::debug!("using the {} backend", kind);

    let limits = settings.limits.clone();
    let outcome = match kind {
        BackendKind::Slurm => {
            let backend = SlurmBackend::new(settings.script.clone());
            run(TaskManager::new(backend, limits), args.command, &settings).await?
        }
        BackendKind::Lsf => {
            let backend = LsfBackend::new(settings.script.clone());
            run(TaskManager::new(backend, limits), args.command, &settings).await?
        }
        BackendKind::Local => {
            run(TaskManager::new(LocalBackend::new(), limits), args.command, &settings).await?
        }
    };

    if let Err(termination) = outcome {
        tracing::error!("{}", termination);
        std::process::exit(termination.exit_code());
    }
    Ok(())
}

/// Config file, then environment, then command-line flags.
fn load_config(args: &Args) -> Result<DroverConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var("DROVER_CONFIG").ok().map(Utf8PathBuf::from));
    let mut config = DroverConfig::load(path.as_deref()).into_diagnostic()?;

    if let Some(max_jobs) = args.max_jobs {
        config.max_jobs = max_jobs;
    }
    if let Some(hours) = args.max_hours {
        config.max_runtime_hours = hours;
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
    }
    Ok(config)
}

/// Run one command. The inner `Err` is a termination the caller turns into an exit code.
async fn run<B: Backend>(
    mut manager: TaskManager<B>,
    command: Command,
    settings: &Settings,
) -> Result<Outcome<()>> {
    match command {
        Command::Submit(submit) => {
            let stages = submit.stages().into_diagnostic()?;
            let options = submit.options().into_diagnostic()?;
            let spec = settings.defaults.spec(stages, options);
            Ok(manager.submit(spec).await.map(|id| println!("{}", id)))
        }
        Command::Status { id } => {
            let status = manager.status(&JobId::from(id)).await.into_diagnostic()?;
            println!("{}", status);
            Ok(Ok(()))
        }
        Command::Wait { ids } => {
            let ids = ids.into_iter().map(JobId::from).collect();
            Ok(manager.wait(Some(ids), 0).await.map(|_| ()))
        }
        Command::Kill { id } => {
            manager.kill(&JobId::from(id)).await;
            Ok(Ok(()))
        }
        Command::Chunks(chunks) => run_chunks(&mut manager, &chunks, settings).await,
        Command::Params { .. } | Command::Peek { .. } => Ok(Ok(())),
    }
}

async fn run_chunks<B: Backend>(
    manager: &mut TaskManager<B>,
    args: &ChunksArgs,
    settings: &Settings,
) -> Result<Outcome<()>> {
    let params = args.params().into_diagnostic()?;
    let mut run = ChunkedRun::new(args.script.clone(), params, args.chunk_size, args.stop);
    run.start = args.start;
    run.clobber = args.clobber;
    run.cleanup = !args.no_cleanup;
    if let Some(memory_mb) = args.chunk_memory_mb().into_diagnostic()? {
        run.chunk_options.memory_mb = Some(memory_mb);
    }

    let ids = match apply(manager, &settings.defaults, &run).await {
        Ok(ids) => ids,
        Err(WorkflowError::Terminated(termination)) => return Ok(Err(termination)),
        Err(e) => return Err(e).into_diagnostic(),
    };
    for id in &ids {
        println!("{}", id);
    }

    if args.wait {
        return Ok(manager.wait(None, 0).await.map(|_| ()));
    }
    Ok(Ok(()))
}

/// Print the newest log of a job.
fn peek(config: &DroverConfig, id: &str) -> Result<()> {
    let log_dir = config.log_dir();
    match find_job_log(&log_dir, id).into_diagnostic()? {
        Some(path) => {
            println!("{}", path);
            let content = std::fs::read_to_string(&path).into_diagnostic()?;
            print!("{}", content);
        }
        None => println!("{} not found.", id),
    }
    Ok(())
}
