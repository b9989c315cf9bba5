//! Checks a [`PublishConfig`] against the filesystem before anything is written.
//!
//! Checks run in a fixed order (name, version, duplicate book names, compiled
//! output directories) and stop at the first violation.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::config::PublishConfig;
use crate::error::PublishError;

pub fn validate(config: &PublishConfig) -> Result<(), PublishError> {
    if config.name.trim().is_empty() {
        error!("[PUBLISH][VALIDATE] Project name is missing");
        return Err(PublishError::MissingField("name"));
    }
    if config.version.trim().is_empty() {
        error!(name = %config.name, "[PUBLISH][VALIDATE] Project version is missing");
        return Err(PublishError::MissingField("version"));
    }

    let mut seen = HashSet::with_capacity(config.books.len());
    for book in &config.books {
        if !seen.insert(book.name.to_lowercase()) {
            error!(book = %book.name, "[PUBLISH][VALIDATE] Duplicate book name");
            return Err(PublishError::DuplicateBookName(book.name.clone()));
        }
    }

    for book in &config.books {
        let path = book.compiled_path();
        if !path.is_dir() {
            error!(book = %book.name, path = %path.display(), "[PUBLISH][VALIDATE] Compiled book is not a directory");
            return Err(PublishError::MissingCompiledBook(path));
        }
        debug!(book = %book.name, path = %path.display(), "Compiled book found");
    }

    info!(
        name = %config.name,
        version = %config.version,
        books = config.books.len(),
        "[PUBLISH][VALIDATE] Config is valid"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookRef;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn book(name: &str, outdir: &Path) -> BookRef {
        BookRef {
            name: name.to_string(),
            outdir: outdir.to_path_buf(),
            kind: None,
            title: None,
        }
    }

    fn config_with_built_books(dir: &TempDir) -> PublishConfig {
        fs::create_dir_all(dir.path().join("book-1")).unwrap();
        fs::create_dir_all(dir.path().join("book-2")).unwrap();
        PublishConfig {
            name: "pandora-cloud".into(),
            version: "1.0.0".into(),
            books: vec![book("book-1", dir.path()), book("book-2", dir.path())],
        }
    }

    #[test]
    fn accepts_books_sharing_an_outdir() {
        let dir = TempDir::new().unwrap();
        let config = config_with_built_books(&dir);
        validate(&config).expect("valid config should pass");
    }

    #[test]
    fn rejects_missing_name() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_built_books(&dir);
        config.name = String::new();
        assert!(matches!(
            validate(&config),
            Err(PublishError::MissingField("name"))
        ));
    }

    #[test]
    fn rejects_missing_version_even_without_books() {
        let config = PublishConfig {
            name: "pandora-cloud".into(),
            version: "  ".into(),
            books: vec![],
        };
        assert!(matches!(
            validate(&config),
            Err(PublishError::MissingField("version"))
        ));
    }

    #[test]
    fn rejects_case_insensitive_duplicate_names_across_outdirs() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::create_dir_all(a.path().join("book-1")).unwrap();
        fs::create_dir_all(b.path().join("BOOK-1")).unwrap();
        let config = PublishConfig {
            name: "pandora-cloud".into(),
            version: "1.0.0".into(),
            books: vec![book("book-1", a.path()), book("BOOK-1", b.path())],
        };
        match validate(&config) {
            Err(PublishError::DuplicateBookName(name)) => assert_eq!(name, "BOOK-1"),
            other => panic!("expected DuplicateBookName, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_compiled_book_with_its_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("book-1")).unwrap();
        let config = PublishConfig {
            name: "pandora-cloud".into(),
            version: "1.0.0".into(),
            books: vec![book("book-1", dir.path()), book("book-2", dir.path())],
        };
        match validate(&config) {
            Err(PublishError::MissingCompiledBook(path)) => {
                assert_eq!(path, dir.path().join("book-2"))
            }
            other => panic!("expected MissingCompiledBook, got {other:?}"),
        }
    }

    #[test]
    fn rejects_a_regular_file_in_place_of_a_compiled_book() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("book-1"), "not a directory").unwrap();
        let config = PublishConfig {
            name: "pandora-cloud".into(),
            version: "1.0.0".into(),
            books: vec![book("book-1", dir.path())],
        };
        match validate(&config) {
            Err(PublishError::MissingCompiledBook(path)) => {
                assert_eq!(path, dir.path().join("book-1"))
            }
            other => panic!("expected MissingCompiledBook, got {other:?}"),
        }
    }
}
