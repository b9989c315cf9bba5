//! High-level pipeline: validate → manifest → archive → upload.
//!
//! [`publish`] walks a linear state machine (see [`PublishPhase`]) and stops at the
//! first failing phase, returning a [`PublishFailure`] that names the phase and the
//! condition. There are no retries and no partial-success reports.
//!
//! Scratch storage is wiped and recreated before the manifest is written, so a rerun
//! after a failed attempt never sees stale manifests or archives. Nothing is cleaned
//! up after a failure; the archive stays on disk if the upload is rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::archive;
use crate::config::PublishConfig;
use crate::error::{PublishError, PublishFailure, PublishPhase};
use crate::manifest::{build_manifest, write_manifest};
use crate::progress::ProgressSink;
use crate::uploader::ArchiveUploader;
use crate::validate::validate;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub archive: PathBuf,
    pub manifest: PathBuf,
    pub books: usize,
    pub archive_size: u64,
}

struct Run {
    phase: PublishPhase,
}

impl Run {
    fn enter(&mut self, phase: PublishPhase) {
        info!(from = %self.phase, to = %phase, "[PUBLISH] Phase transition");
        self.phase = phase;
    }

    fn fail(&self, error: PublishError) -> PublishFailure {
        error!(phase = %self.phase, error = %error, "[PUBLISH][ERROR] Publish failed");
        PublishFailure::new(self.phase, error)
    }
}

pub async fn publish<U>(
    config: &PublishConfig,
    storage: &Path,
    uploader: &U,
    progress: Arc<dyn ProgressSink>,
) -> Result<PublishReport, PublishFailure>
where
    U: ArchiveUploader + ?Sized,
{
    let mut run = Run {
        phase: PublishPhase::Idle,
    };
    info!(
        name = %config.name,
        version = %config.version,
        storage = %storage.display(),
        "[PUBLISH] Starting publish pipeline"
    );

    run.enter(PublishPhase::Validating);
    validate(config).map_err(|e| run.fail(e))?;

    run.enter(PublishPhase::BuildingManifest);
    reset_storage(storage).map_err(|e| run.fail(e))?;
    let manifest = build_manifest(config);
    let manifest_path = write_manifest(&manifest, storage).map_err(|e| run.fail(e))?;

    run.enter(PublishPhase::Assembling);
    let archive_path = archive::assemble(config, storage, progress.as_ref())
        .await
        .map_err(|e| run.fail(e))?;
    let archive_size = fs::metadata(&archive_path)
        .map(|m| m.len())
        .map_err(|e| {
            run.fail(PublishError::Storage {
                path: archive_path.clone(),
                source: e,
            })
        })?;

    run.enter(PublishPhase::Uploading);
    uploader
        .upload(&archive_path, config.books.len(), Arc::clone(&progress))
        .await
        .map_err(|e| run.fail(e))?;

    run.enter(PublishPhase::Done);
    info!(
        archive = %archive_path.display(),
        size = archive_size,
        books = config.books.len(),
        "[PUBLISH] Publish complete"
    );
    Ok(PublishReport {
        archive: archive_path,
        manifest: manifest_path,
        books: config.books.len(),
        archive_size,
    })
}

/// Removes `storage` if present and recreates it empty.
pub fn reset_storage(storage: &Path) -> Result<(), PublishError> {
    let storage_err = |e: std::io::Error| PublishError::Storage {
        path: storage.to_path_buf(),
        source: e,
    };
    if storage.exists() {
        fs::remove_dir_all(storage).map_err(|e| {
            error!(error = ?e, path = %storage.display(), "Failed to clear scratch storage");
            storage_err(e)
        })?;
    }
    fs::create_dir_all(storage).map_err(|e| {
        error!(error = ?e, path = %storage.display(), "Failed to create scratch storage");
        storage_err(e)
    })?;
    info!(path = %storage.display(), "[PUBLISH] Scratch storage reset");
    Ok(())
}
