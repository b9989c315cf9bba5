//! Packs the manifest and every compiled book into a single zip archive.
//!
//! Books are packaged concurrently, and so are the file reads inside each book.
//! Every branch returns its own entries; they are merged after the join. Entry
//! names always use `/` no matter how the host spells paths.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::{debug, error, info};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::config::{BookRef, PublishConfig};
use crate::error::PublishError;
use crate::manifest::MANIFEST_FILE;
use crate::progress::ProgressSink;

/// Progress units reserved per book: one for packaging, one for the upload.
pub const UNITS_PER_BOOK: u64 = 2;

/// Units per book the assembler ticks itself. The rest are left for the uploader.
pub const PACKAGING_UNITS_PER_BOOK: u64 = 1;

/// Top-level archive directory holding the books.
pub const BOOKS_DIR: &str = "books";

/// Archive entry name for a file at `relative` inside book `book`.
///
/// Returns `None` when a component is not valid UTF-8.
pub fn archive_entry_name(book: &str, relative: &Path) -> Option<String> {
    let mut name = format!("{BOOKS_DIR}/{book}");
    for component in relative.components() {
        name.push('/');
        name.push_str(component.as_os_str().to_str()?);
    }
    Some(name)
}

/// Builds `<storage>/<name>_<version>.zip` from `<storage>/docs.json` and the books.
pub async fn assemble(
    config: &PublishConfig,
    storage: &Path,
    progress: &dyn ProgressSink,
) -> Result<PathBuf, PublishError> {
    let manifest_path = storage.join(MANIFEST_FILE);
    let manifest = tokio::fs::read(&manifest_path).await.map_err(|e| {
        error!(error = ?e, path = %manifest_path.display(), "[PUBLISH][ARCHIVE] Failed to read manifest");
        PublishError::ArchiveIo {
            path: manifest_path.clone(),
            source: e,
        }
    })?;

    let mut entries: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    entries.insert(MANIFEST_FILE.to_string(), manifest);

    progress.expand_by(UNITS_PER_BOOK * config.books.len() as u64);

    info!(books = config.books.len(), "[PUBLISH][ARCHIVE] Packaging books");
    let packaged = try_join_all(config.books.iter().map(|book| package_book(book, progress))).await?;
    for (name, data) in packaged.into_iter().flatten() {
        entries.insert(name, data);
    }

    let bytes = encode_zip(&entries)?;
    let archive_path = storage.join(config.archive_file_name());
    tokio::fs::write(&archive_path, &bytes).await.map_err(|e| {
        error!(error = ?e, path = %archive_path.display(), "[PUBLISH][ARCHIVE] Failed to write archive");
        PublishError::Storage {
            path: archive_path.clone(),
            source: e,
        }
    })?;

    info!(
        path = %archive_path.display(),
        entries = entries.len(),
        size = bytes.len(),
        "[PUBLISH][ARCHIVE] Archive written"
    );
    Ok(archive_path)
}

async fn package_book(
    book: &BookRef,
    progress: &dyn ProgressSink,
) -> Result<Vec<(String, Vec<u8>)>, PublishError> {
    let root = book.compiled_path();
    let files = list_files(&root)?;
    debug!(book = %book.name, files = files.len(), "Enumerated book files");

    let reads = files.into_iter().map(|path| {
        let root = &root;
        async move {
            let data = tokio::fs::read(&path).await.map_err(|e| {
                error!(error = ?e, path = %path.display(), "[PUBLISH][ARCHIVE] Failed to read book file");
                PublishError::ArchiveIo {
                    path: path.clone(),
                    source: e,
                }
            })?;
            let relative = path.strip_prefix(root).map_err(|e| PublishError::ArchiveIo {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;
            let name = archive_entry_name(&book.name, relative).ok_or_else(|| {
                error!(path = %path.display(), "[PUBLISH][ARCHIVE] Book file name is not valid UTF-8");
                PublishError::ArchiveIo {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    ),
                }
            })?;
            debug!(entry = %name, size = data.len(), "Packaged file");
            Ok::<_, PublishError>((name, data))
        }
    });
    let entries = try_join_all(reads).await?;

    progress.tick();
    info!(book = %book.name, files = entries.len(), "[PUBLISH][ARCHIVE] Book packaged");
    Ok(entries)
}

/// Every regular file under `root`, recursively, following symlinks. Directories are skipped.
fn list_files(root: &Path) -> Result<Vec<PathBuf>, PublishError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            error!(error = %e, path = %path.display(), "[PUBLISH][ARCHIVE] Failed to walk book directory");
            PublishError::ArchiveIo {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Encodes entries in key order with a fixed timestamp so identical input gives identical bytes.
fn encode_zip(entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>, PublishError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data).map_err(ZipError::Io)?;
    }
    Ok(zip.finish()?.into_inner())
}
