#![allow(dead_code)]

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::Router;
use book_publish_core::config::{BookRef, PublishConfig};
use book_publish_core::progress::ProgressSink;

/// One multipart field as the fake doc cloud saw it.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct DocCloud {
    pub url: String,
    pub received: Arc<Mutex<Vec<ReceivedPart>>>,
}

type CloudState = (Arc<Mutex<Vec<ReceivedPart>>>, &'static str);

async fn accept(State((received, reply)): State<CloudState>, mut multipart: Multipart) -> String {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        received.lock().unwrap().push(ReceivedPart {
            field: name,
            file_name,
            bytes,
        });
    }
    reply.to_string()
}

/// Starts a doc cloud on a free local port that answers every upload with `reply`.
pub async fn spawn_doc_cloud(reply: &'static str) -> DocCloud {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/upload", post(accept))
        .layer(DefaultBodyLimit::disable())
        .with_state((Arc::clone(&received), reply));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    DocCloud {
        url: format!("http://{addr}/upload"),
        received,
    }
}

/// Starts a doc cloud that never answers within `delay`.
pub async fn spawn_stalled_doc_cloud(delay: Duration) -> String {
    let app = Router::new().route(
        "/upload",
        post(move || async move {
            tokio::time::sleep(delay).await;
            r#"{"success":true}"#
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/upload")
}

/// An address nothing listens on.
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/upload")
}

/// Writes `files` (relative path, content) under `outdir/book`.
pub fn write_book(outdir: &Path, book: &str, files: &[(&str, &[u8])]) {
    for (relative, content) in files {
        let path = outdir.join(book).join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// The two-book `pandora-cloud` project with both books compiled under `build`.
pub fn pandora_cloud(build: &Path) -> PublishConfig {
    write_book(
        build,
        "book-1",
        &[
            ("index.html", b"<h1>Book one</h1>".as_slice()),
            ("sub/page.html", b"<p>page</p>".as_slice()),
            ("assets/logo.png", [0x89u8, 0x50, 0x4e, 0x47].as_slice()),
        ],
    );
    write_book(build, "book-2", &[("index.html", b"<h1>Book two</h1>".as_slice())]);
    PublishConfig {
        name: "pandora-cloud".into(),
        version: "1.0.0".into(),
        books: vec![
            BookRef {
                name: "book-1".into(),
                outdir: build.to_path_buf(),
                kind: None,
                title: None,
            },
            BookRef {
                name: "book-2".into(),
                outdir: build.to_path_buf(),
                kind: None,
                title: None,
            },
        ],
    }
}

/// Entry names in archive order.
pub fn archive_names(path: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    zip.file_names().map(str::to_string).collect()
}

pub fn archive_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

/// Progress sink that only counts calls.
#[derive(Default)]
pub struct CountingSink {
    pub expanded: AtomicU64,
    pub ticks: AtomicU64,
    pub fills: AtomicU64,
}

impl CountingSink {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn expanded(&self) -> u64 {
        self.expanded.load(Ordering::SeqCst)
    }

    pub fn fills(&self) -> u64 {
        self.fills.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CountingSink {
    fn expand_to(&self, total: u64) {
        self.expanded.store(total, Ordering::SeqCst);
    }

    fn expand_by(&self, units: u64) {
        self.expanded.fetch_add(units, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn fill(&self) {
        self.fills.fetch_add(1, Ordering::SeqCst);
    }
}
