//! Builds and persists the `docs.json` manifest describing the archive.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::PublishConfig;
use crate::error::PublishError;

pub const MANIFEST_FILE: &str = "docs.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub books: Vec<ManifestBook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBook {
    pub name: String,
    pub outdir: PathBuf,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub title: String,
}

/// Derives the manifest from the config, defaulting every missing title to the book name.
pub fn build_manifest(config: &PublishConfig) -> Manifest {
    Manifest {
        name: config.name.clone(),
        version: config.version.clone(),
        books: config
            .books
            .iter()
            .map(|book| ManifestBook {
                name: book.name.clone(),
                outdir: book.outdir.clone(),
                kind: book.kind.clone(),
                title: book.title.clone().unwrap_or_else(|| book.name.clone()),
            })
            .collect(),
    }
}

impl Manifest {
    pub fn to_json(&self) -> Result<String, PublishError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the manifest to `<storage>/docs.json` and returns that path.
pub fn write_manifest(manifest: &Manifest, storage: &Path) -> Result<PathBuf, PublishError> {
    let path = storage.join(MANIFEST_FILE);
    let json = manifest.to_json()?;
    fs::write(&path, json.as_bytes()).map_err(|e| {
        error!(error = ?e, path = %path.display(), "[PUBLISH][MANIFEST] Failed to write manifest");
        PublishError::Storage {
            path: path.clone(),
            source: e,
        }
    })?;
    info!(
        path = %path.display(),
        books = manifest.books.len(),
        "[PUBLISH][MANIFEST] Manifest written"
    );
    Ok(path)
}
