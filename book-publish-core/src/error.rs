//! Error types for the publish pipeline.

use std::fmt;
use std::path::PathBuf;

/// A single failed condition in one of the publish phases.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("duplicate book name: {0}")]
    DuplicateBookName(String),

    #[error("compiled book not found at {}", .0.display())]
    MissingCompiledBook(PathBuf),

    #[error("scratch storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to read {} while packaging: {source}", .path.display())]
    ArchiveIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip encoding error: {0}")]
    ArchiveFormat(#[from] zip::result::ZipError),

    #[error("upload transport error: {0}")]
    Transport(String),

    #[error("response not in expected JSON format: {body}")]
    Protocol { body: String },

    #[error("doc cloud rejected the package: {0}")]
    RemoteRejected(String),
}

/// Stage of a publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Idle,
    Validating,
    BuildingManifest,
    Assembling,
    Uploading,
    Done,
}

impl fmt::Display for PublishPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishPhase::Idle => "idle",
            PublishPhase::Validating => "validating",
            PublishPhase::BuildingManifest => "building manifest",
            PublishPhase::Assembling => "assembling archive",
            PublishPhase::Uploading => "uploading",
            PublishPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of a failed run: which phase failed and why.
#[derive(Debug, thiserror::Error)]
#[error("publish failed while {phase}: {error}")]
pub struct PublishFailure {
    pub phase: PublishPhase,
    #[source]
    pub error: PublishError,
}

impl PublishFailure {
    pub fn new(phase: PublishPhase, error: PublishError) -> Self {
        Self { phase, error }
    }
}
