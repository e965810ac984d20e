//! Chunked scatter/gather workflows on top of drover-manager.

pub mod partition;
pub mod workflow;

pub use partition::{Chunk, ChunkError, partition};
pub use workflow::{
    CHUNK_MEMORY_MB, ChunkedRun, JOIN_PROGRAM, WorkflowError, apply, filelist_path,
    intermediate_path,
};
