//! # uploader: pushes the finished archive to the doc cloud
//!
//! The [`ArchiveUploader`] trait is the seam the orchestrator talks to, so runs can be
//! driven against a mock in tests. [`HttpUploader`] is the real implementation: one
//! multipart POST carrying the archive under the `doc-package` field.
//!
//! ## Progress
//! The archive is streamed from disk in chunks. As chunks are handed to the
//! transport, cumulative bytes are mapped onto `max(books, 10)` steps and each
//! crossed step boundary ticks the progress sink once. The final slice is left for
//! [`ProgressSink::fill`], which only happens once the remote side confirms success.
//!
//! ## Response contract
//! The body must be JSON shaped like `{ "success": bool, "error"?: string }`.
//! Anything else is a protocol error carrying the raw body.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::archive::{PACKAGING_UNITS_PER_BOOK, UNITS_PER_BOOK};
use crate::error::PublishError;
use crate::progress::ProgressSink;

/// Multipart field the doc cloud expects the archive under.
pub const DOC_PACKAGE_FIELD: &str = "doc-package";

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Lower bound on visible upload progress increments.
pub const MIN_UPLOAD_STEPS: u64 = 10;

pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Uploads a finished archive and reports progress while doing so.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    /// Sends the archive at `archive`. `book_count` sizes the progress steps; the
    /// assembler has already reserved one unit per book for this phase.
    async fn upload(
        &self,
        archive: &Path,
        book_count: usize,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<(), PublishError>;
}

/// The doc cloud's answer to an upload.
#[derive(Debug, Deserialize)]
pub struct UploadVerdict {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Validates a raw response body against the doc cloud contract.
pub fn check_verdict(body: &str) -> Result<(), PublishError> {
    let verdict: UploadVerdict = serde_json::from_str(body).map_err(|e| {
        error!(error = ?e, body = %body, "[PUBLISH][UPLOAD] Response not in expected JSON format");
        PublishError::Protocol {
            body: body.to_string(),
        }
    })?;
    if !verdict.success {
        let reason = verdict.error.unwrap_or_default();
        error!(reason = %reason, "[PUBLISH][UPLOAD] Doc cloud rejected the package");
        return Err(PublishError::RemoteRejected(reason));
    }
    Ok(())
}

/// Number of upload progress steps for a run publishing `book_count` books.
pub fn upload_steps(book_count: usize) -> u64 {
    (book_count as u64).max(MIN_UPLOAD_STEPS)
}

/// Progress units the assembler left unticked for the upload of `book_count` books.
pub fn reserved_upload_units(book_count: usize) -> u64 {
    (UNITS_PER_BOOK - PACKAGING_UNITS_PER_BOOK) * book_count as u64
}

/// Maps cumulative bytes sent onto evenly sized progress steps.
#[derive(Debug)]
pub struct UploadSteps {
    total: u64,
    step: u64,
    next: u64,
    sent: u64,
}

impl UploadSteps {
    pub fn new(total_bytes: u64, steps: u64) -> Self {
        let step = (total_bytes / steps.max(1)).max(1);
        Self {
            total: total_bytes,
            step,
            next: step,
            sent: 0,
        }
    }

    /// Records `bytes` more sent and returns how many step boundaries were crossed.
    /// Nothing is reported once the full size is reached.
    pub fn advance(&mut self, bytes: u64) -> u64 {
        self.sent += bytes;
        let mut crossed = 0;
        while self.sent < self.total && self.sent >= self.next {
            crossed += 1;
            self.next += self.step;
        }
        crossed
    }
}

/// Uploads archives to the doc cloud over HTTP.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    chunk_size: usize,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to construct HTTP client");
                PublishError::Transport(error_chain(&e))
            })?;
        info!(endpoint = %endpoint, timeout_secs = timeout.as_secs(), "Initialized HttpUploader");
        Ok(Self {
            client,
            endpoint,
            chunk_size: UPLOAD_CHUNK_SIZE,
        })
    }

    /// Overrides the streaming chunk size, which bounds progress granularity.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ArchiveUploader for HttpUploader {
    async fn upload(
        &self,
        archive: &Path,
        book_count: usize,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<(), PublishError> {
        let file = tokio::fs::File::open(archive).await.map_err(|e| {
            error!(error = ?e, path = %archive.display(), "[PUBLISH][UPLOAD] Failed to open archive");
            PublishError::Storage {
                path: archive.to_path_buf(),
                source: e,
            }
        })?;
        let size = file
            .metadata()
            .await
            .map_err(|e| PublishError::Storage {
                path: archive.to_path_buf(),
                source: e,
            })?
            .len();

        let steps = upload_steps(book_count);
        let reserved = reserved_upload_units(book_count);
        if steps > reserved {
            progress.expand_by(steps - reserved);
        }

        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package.zip".to_string());
        info!(
            endpoint = %self.endpoint,
            file = %file_name,
            size,
            steps,
            "[PUBLISH][UPLOAD] Uploading archive"
        );

        let mut tracker = UploadSteps::new(size, steps);
        let sink = Arc::clone(&progress);
        let stream = ReaderStream::with_capacity(file, self.chunk_size).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                for _ in 0..tracker.advance(bytes.len() as u64) {
                    sink.tick();
                }
            }
            chunk
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), size)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| PublishError::Transport(error_chain(&e)))?;
        let form = Form::new().part(DOC_PACKAGE_FIELD, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, endpoint = %self.endpoint, "[PUBLISH][UPLOAD] Transport failure");
                PublishError::Transport(error_chain(&e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = ?e, status = %status, "[PUBLISH][UPLOAD] Failed to read response body");
            PublishError::Transport(error_chain(&e))
        })?;
        debug!(status = %status, body = %body, "[PUBLISH][UPLOAD] Doc cloud responded");

        check_verdict(&body)?;
        progress.fill();
        info!(status = %status, "[PUBLISH][UPLOAD] Doc cloud accepted the package");
        Ok(())
    }
}

/// Flattens an error and its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
