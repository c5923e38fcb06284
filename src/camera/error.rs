use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera busy: {path} held by pid {holder}")]
    Busy { path: PathBuf, holder: u32 },
    #[error("camera lock {path}: {source}")]
    Lock { path: PathBuf, source: io::Error },
    #[error("camera used before it was acquired")]
    NotAcquired,
    #[error("camera used before it was configured")]
    NotConfigured,
    #[error("output directory {path}: {source}")]
    Output { path: PathBuf, source: io::Error },
    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program} exited with {status}: {stderr}")]
    Backend {
        program: String,
        status: String,
        stderr: String,
    },
}
