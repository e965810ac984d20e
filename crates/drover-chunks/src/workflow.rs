//! Scatter a computation over time chunks, then gather the pieces.
//!
//! Every chunk runs the same program with its own index range and its own
//! intermediate output. One join job concatenates the intermediates once
//! all chunk jobs have succeeded, and an optional cleanup job removes them
//! after the join.

use crate::partition::{Chunk, ChunkError, partition};
use camino::{Utf8Path, Utf8PathBuf};
use drover_core::{Backend, JobDefaults, JobId, Params, ParamsError, SubmitOptions, encode_params};
use drover_manager::{TaskManager, Termination};
use serde_json::{Value, json};
use thiserror::Error;

/// Memory requested per chunk job unless overridden.
pub const CHUNK_MEMORY_MB: u64 = 30 * 1024;

/// Program used to concatenate intermediates along the record dimension.
pub const JOIN_PROGRAM: &str = "ncrcat";

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("Missing parameter \"{0}\"")]
    MissingParam(&'static str),
    #[error("Parameter \"file_out\" must be a string")]
    FileOutNotString,
    #[error("Failed to write {path}: {error}")]
    Io {
        path: Utf8PathBuf,
        error: std::io::Error,
    },
    #[error(transparent)]
    Terminated(#[from] Termination),
}

/// One chunked run of a program over `[start, stop)`.
#[derive(Debug, Clone)]
pub struct ChunkedRun {
    /// Program invoked as `<script> <parameter blob>`
    pub script: String,
    /// Must hold `file_in` and a string `file_out`
    pub params: Params,
    pub chunk_size: u64,
    pub start: u64,
    pub stop: u64,
    /// Recompute outputs that already exist
    pub clobber: bool,
    /// Remove intermediates once joined
    pub cleanup: bool,
    pub chunk_options: SubmitOptions,
    pub join_options: SubmitOptions,
    pub join_program: String,
}

impl ChunkedRun {
    pub fn new(script: impl Into<String>, params: Params, chunk_size: u64, stop: u64) -> Self {
        Self {
            script: script.into(),
            params,
            chunk_size,
            start: 0,
            stop,
            clobber: false,
            cleanup: true,
            chunk_options: SubmitOptions {
                memory_mb: Some(CHUNK_MEMORY_MB),
                ..Default::default()
            },
            join_options: SubmitOptions {
                modules: Some(vec!["nco".to_string()]),
                module_purge: Some(false),
                ..Default::default()
            },
            join_program: JOIN_PROGRAM.to_string(),
        }
    }

    /// The final output path, after checking the required parameters.
    pub fn file_out(&self) -> Result<Utf8PathBuf, WorkflowError> {
        if self.params.get("file_in").is_none_or(Value::is_null) {
            return Err(WorkflowError::MissingParam("file_in"));
        }
        match self.params.get("file_out") {
            None | Some(Value::Null) => Err(WorkflowError::MissingParam("file_out")),
            Some(Value::String(path)) => Ok(Utf8PathBuf::from(path)),
            Some(_) => Err(WorkflowError::FileOutNotString),
        }
    }

    /// Parameters for one chunk job.
    pub fn chunk_params(&self, chunk: Chunk, output: &Utf8Path) -> Params {
        let mut params = self.params.clone();
        params.insert(
            "isel".to_string(),
            json!({"time": {"start": chunk.lo, "stop": chunk.hi}}),
        );
        params.insert("file_out".to_string(), json!(output.as_str()));
        params
    }
}

/// Where a chunk writes its slice of the output.
pub fn intermediate_path(file_out: &Utf8Path, chunk: Chunk) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{}.tnx.{}", file_out, chunk))
}

/// Where the ordered list of intermediates is written for the join job.
pub fn filelist_path(file_out: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{}.filelist", file_out))
}

fn write_filelist(path: &Utf8Path, pieces: &[Utf8PathBuf]) -> Result<(), WorkflowError> {
    let mut contents = String::new();
    for piece in pieces {
        contents.push_str(piece.as_str());
        contents.push('\n');
    }
    std::fs::write(path, contents).map_err(|error| WorkflowError::Io {
        path: path.to_owned(),
        error,
    })
}

fn words<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| s.as_ref().to_string()).collect()
}

/// Submit the chunk, join and cleanup jobs of `run`.
///
/// Returns the ids of the chunk jobs actually submitted. If the final
/// output exists and `clobber` is off nothing is submitted; intermediates
/// that exist are reused the same way.
pub async fn apply<B: Backend>(
    manager: &mut TaskManager<B>,
    defaults: &JobDefaults,
    run: &ChunkedRun,
) -> Result<Vec<JobId>, WorkflowError> {
    let file_out = run.file_out()?;
    if file_out.exists() && !run.clobber {
        tracing::info!("{} exists, nothing to do", file_out);
        return Ok(Vec::new());
    }

    let chunks = partition(run.start, run.stop, run.chunk_size)?;
    tracing::info!(
        "{} over {} chunks of [{}, {})",
        run.script,
        chunks.len(),
        run.start,
        run.stop
    );

    let mut chunk_ids = Vec::new();
    let mut pieces = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let piece = intermediate_path(&file_out, chunk);

        if piece.exists() && !run.clobber {
            tracing::info!("reusing {}", piece);
        } else {
            let blob = encode_params(&run.chunk_params(chunk, &piece))?;
            let spec = defaults.spec(
                vec![vec![run.script.clone(), blob]],
                run.chunk_options.clone(),
            );
            chunk_ids.push(manager.submit(spec).await?);
        }
        pieces.push(piece);
    }

    let list = filelist_path(&file_out);
    write_filelist(&list, &pieces)?;

    let join = defaults.spec(
        vec![words([
            "cat",
            list.as_str(),
            "|",
            run.join_program.as_str(),
            "-o",
            file_out.as_str(),
        ])],
        SubmitOptions {
            dependencies: chunk_ids.clone(),
            ..run.join_options.clone()
        },
    );
    let join_id = manager.submit(join).await?;

    if run.cleanup {
        let mut remove = words(["rm", "-f"]);
        remove.extend(words(&pieces));
        remove.push(list.to_string());

        let cleanup = defaults.spec(
            vec![remove],
            SubmitOptions {
                dependencies: vec![join_id],
                ..Default::default()
            },
        );
        manager.submit(cleanup).await?;
    }

    Ok(chunk_ids)
}
