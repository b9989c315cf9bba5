use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The project being published: identity plus the books that make it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub books: Vec<BookRef>,
}

impl PublishConfig {
    /// File name of the archive produced for this config.
    pub fn archive_file_name(&self) -> String {
        format!("{}_{}.zip", self.name, self.version)
    }

    pub fn trace_loaded(&self) {
        info!(
            name = %self.name,
            version = %self.version,
            books_count = self.books.len(),
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}

/// One independently compiled book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRef {
    pub name: String,
    /// Directory holding the compiled book; the book itself lives at `outdir/name`.
    pub outdir: PathBuf,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl BookRef {
    pub fn compiled_path(&self) -> PathBuf {
        Path::new(&self.outdir).join(&self.name)
    }
}
