use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::document::{render_markdown, DocumentView, ExampleView};
use crate::error::{KbError, Result};
use crate::index::{DocumentIndex, DocumentRef, Visualization};
use crate::search::{self, DocumentPreview, SearchResponse};
use crate::storage::{DocumentStore, FsStore};

/// Category listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub documents: usize,
}

/// Document listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
}

/// Snapshot of the whole index: category ids in order, the
/// `category -> id -> path` table, and visualization ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOverview {
    pub categories: Vec<String>,
    pub documents: BTreeMap<String, BTreeMap<String, String>>,
    pub visualizations: Vec<String>,
}

/// Knowledge base whose store is chosen at runtime
pub type DynKnowledgeBase = KnowledgeBase<Box<dyn DocumentStore>>;

/// Every knowledge base operation, shared by all transports
pub struct KnowledgeBase<S = FsStore> {
    store: S,
}

impl KnowledgeBase<FsStore> {
    /// Knowledge base reading documents from disk
    pub fn open(index: DocumentIndex) -> Self {
        Self::new(FsStore::new(index))
    }
}

impl<S: DocumentStore> KnowledgeBase<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &DocumentIndex {
        self.store.index()
    }

    /// Fetch a document and render it to HTML
    pub fn get_document(&self, category: &str, id: &str) -> Result<DocumentView> {
        if category.is_empty() {
            return Err(KbError::InvalidArgument("category".to_string()));
        }
        if id.is_empty() {
            return Err(KbError::InvalidArgument("doc_id".to_string()));
        }

        let doc = self.store.resolve(category, id)?;
        self.view(doc)
    }

    /// Fetch a document by its root-relative path
    pub fn get_document_by_path(&self, path: &str) -> Result<DocumentView> {
        if path.is_empty() {
            return Err(KbError::InvalidArgument("path".to_string()));
        }

        let doc = self
            .index()
            .find_by_path(path)
            .ok_or_else(|| KbError::not_found("document", path))?;
        self.view(doc)
    }

    fn view(&self, doc: &DocumentRef) -> Result<DocumentView> {
        let content = self.store.read(doc)?;
        let html_content = render_markdown(&content);
        Ok(DocumentView {
            id: doc.id.clone(),
            category: doc.category.clone(),
            content,
            html_content,
        })
    }

    pub fn search(&self, keyword: &str) -> Result<SearchResponse> {
        search::search(&self.store, keyword)
    }

    pub fn search_previews(&self, query: &str) -> Result<Vec<DocumentPreview>> {
        search::search_previews(&self.store, query)
    }

    pub fn categories(&self) -> Vec<CategorySummary> {
        let index = self.index();
        index
            .categories()
            .iter()
            .map(|c| CategorySummary {
                id: c.id.clone(),
                name: c.name.clone(),
                documents: index.documents(&c.id).count(),
            })
            .collect()
    }

    pub fn documents(&self, category: &str) -> Result<Vec<DocumentSummary>> {
        if category.is_empty() {
            return Err(KbError::InvalidArgument("category".to_string()));
        }

        let index = self.index();
        if !index.has_category(category) {
            return Err(KbError::not_found("category", category));
        }

        Ok(index
            .documents(category)
            .map(|doc| DocumentSummary {
                id: doc.id.clone(),
                name: doc.name.clone(),
                path: doc.path.display().to_string(),
            })
            .collect())
    }

    pub fn get_index(&self) -> IndexOverview {
        let index = self.index();

        let mut documents: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for doc in index.all() {
            documents
                .entry(doc.category.clone())
                .or_default()
                .insert(doc.id.clone(), doc.path.display().to_string());
        }

        IndexOverview {
            categories: index.categories().iter().map(|c| c.id.clone()).collect(),
            documents,
            visualizations: index.visualizations().iter().map(|v| v.id.clone()).collect(),
        }
    }

    pub fn visualizations(&self) -> &[Visualization] {
        self.index().visualizations()
    }

    pub fn visualization(&self, id: &str) -> Result<&Visualization> {
        self.index().resolve_visualization(id)
    }

    /// Read `Assets/Scripts/<id>.cs` under the knowledge base root
    pub fn get_example(&self, id: &str) -> Result<ExampleView> {
        if id.is_empty() {
            return Err(KbError::InvalidArgument("example_id".to_string()));
        }
        if id.contains(['/', '\\']) || id.contains("..") {
            return Err(KbError::InvalidArgument(format!("example_id (invalid value {id:?})")));
        }

        let path = self.examples_dir().join(format!("{id}.cs"));
        if !path.is_file() {
            return Err(KbError::not_found("example", id));
        }

        let content = fs::read_to_string(&path).map_err(|source| KbError::Read { path, source })?;
        Ok(ExampleView {
            id: id.to_string(),
            content,
        })
    }

    fn examples_dir(&self) -> PathBuf {
        self.index().root().join("Assets").join("Scripts")
    }
}
