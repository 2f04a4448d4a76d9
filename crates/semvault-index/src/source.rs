//! The text source boundary.
//!
//! The index never parses binary formats itself: a [`TextSource`] hands over
//! raw text that some external collaborator already extracted. `None` from
//! [`TextSource::get_text`] means extraction is unavailable for that
//! document; builds skip it without failing.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::RwLock;

use crate::error::{IndexError, Result};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplier of document identifiers and their raw text.
pub trait TextSource: Send + Sync {
    /// Identifiers of every document currently in the collection.
    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Raw text for one document, or `None` when no text can be produced.
    fn get_text(&self, path: &str) -> BoxFuture<'_, Result<Option<String>>>;
}

/// Filesystem-backed source reading plain-text documents under a root
/// directory. Hidden files and gitignored paths are skipped.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["md".into(), "txt".into()],
        }
    }

    /// Replace the default `md`/`txt` extension filter.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn indexable(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.iter().any(|x| x == &e)
            })
    }
}

impl TextSource for FsSource {
    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let mut docs: Vec<String> = ignore::WalkBuilder::new(&self.root)
                .hidden(true)
                .git_ignore(true)
                .build()
                .flatten()
                .filter(|e| {
                    e.file_type().is_some_and(|ft| ft.is_file()) && self.indexable(e.path())
                })
                .map(|e| {
                    e.path()
                        .strip_prefix(&self.root)
                        .unwrap_or(e.path())
                        .to_string_lossy()
                        .replace('\\', "/")
                })
                .collect();
            docs.sort();
            Ok(docs)
        })
    }

    fn get_text(&self, path: &str) -> BoxFuture<'_, Result<Option<String>>> {
        let abs = self.root.join(path);
        Box::pin(async move {
            match tokio::fs::read_to_string(&abs).await {
                Ok(text) => Ok(Some(text)),
                // Missing or non-UTF8 content is "nothing to extract", not a
                // build failure.
                Err(e)
                    if e.kind() == std::io::ErrorKind::NotFound
                        || e.kind() == std::io::ErrorKind::InvalidData =>
                {
                    Ok(None)
                }
                Err(e) => Err(IndexError::Io(e)),
            }
        })
    }
}

/// In-process source for tests and programmatic indexing.
#[derive(Debug, Default)]
pub struct MemorySource {
    docs: RwLock<BTreeMap<String, String>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a document.
    pub fn put(&self, path: impl Into<String>, text: impl Into<String>) {
        self.docs
            .write()
            .expect("source lock poisoned")
            .insert(path.into(), text.into());
    }

    /// Remove a document from the collection.
    pub fn remove(&self, path: &str) {
        self.docs.write().expect("source lock poisoned").remove(path);
    }
}

impl TextSource for MemorySource {
    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            Ok(self
                .docs
                .read()
                .expect("source lock poisoned")
                .keys()
                .cloned()
                .collect())
        })
    }

    fn get_text(&self, path: &str) -> BoxFuture<'_, Result<Option<String>>> {
        let path = path.to_owned();
        Box::pin(async move {
            Ok(self
                .docs
                .read()
                .expect("source lock poisoned")
                .get(&path)
                .cloned())
        })
    }
}
