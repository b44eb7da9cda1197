use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{KbError, Result};
use crate::index::{DocumentIndex, DocumentRef};

/// Read access to the documents named by an index.
///
/// Implementations never mutate the index after construction, so a store
/// can be shared between concurrent callers without locking.
pub trait DocumentStore: Send + Sync {
    fn index(&self) -> &DocumentIndex;

    /// Read the full text of a document
    fn read(&self, doc: &DocumentRef) -> Result<String>;

    fn resolve(&self, category: &str, id: &str) -> Result<&DocumentRef> {
        self.index().resolve(category, id)
    }

    fn all(&self) -> &[DocumentRef] {
        self.index().all()
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    fn index(&self) -> &DocumentIndex {
        (**self).index()
    }

    fn read(&self, doc: &DocumentRef) -> Result<String> {
        (**self).read(doc)
    }
}

/// Document store backed by UTF-8 files on disk
pub struct FsStore {
    index: DocumentIndex,
}

impl FsStore {
    pub fn new(index: DocumentIndex) -> Self {
        Self { index }
    }
}

impl DocumentStore for FsStore {
    fn index(&self) -> &DocumentIndex {
        &self.index
    }

    fn read(&self, doc: &DocumentRef) -> Result<String> {
        fs::read_to_string(&doc.path).map_err(|source| KbError::Read {
            path: doc.path.clone(),
            source,
        })
    }
}

/// Document store holding every document's content in memory.
///
/// Filled by [`MemoryStore::preload`], by `pack::load_bundle` from a packed
/// archive, or entry by entry with [`MemoryStore::insert`].
#[derive(Debug)]
pub struct MemoryStore {
    index: DocumentIndex,
    contents: HashMap<PathBuf, String>,
}

impl MemoryStore {
    pub fn new(index: DocumentIndex) -> Self {
        Self {
            index,
            contents: HashMap::new(),
        }
    }

    /// Set the content of an indexed document
    pub fn insert(&mut self, category: &str, id: &str, content: impl Into<String>) -> Result<()> {
        let path = self.index.resolve(category, id)?.path.clone();
        self.contents.insert(path, content.into());
        Ok(())
    }

    pub fn into_index(self) -> DocumentIndex {
        self.index
    }

    /// Load every indexed document from disk, skipping unreadable ones
    pub fn preload(index: DocumentIndex) -> Self {
        let mut contents = HashMap::new();
        for doc in index.all() {
            match fs::read_to_string(&doc.path) {
                Ok(content) => {
                    contents.insert(doc.path.clone(), content);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}/{} ({:?}): {}", doc.category, doc.id, doc.path, e);
                }
            }
        }
        tracing::info!("Preloaded {} of {} documents", contents.len(), index.all().len());
        Self { index, contents }
    }
}

impl DocumentStore for MemoryStore {
    fn index(&self) -> &DocumentIndex {
        &self.index
    }

    fn read(&self, doc: &DocumentRef) -> Result<String> {
        self.contents.get(&doc.path).cloned().ok_or_else(|| KbError::Read {
            path: doc.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "document content not loaded"),
        })
    }
}
