use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{KbError, Result};

mod catalog;
mod scan;

pub use catalog::{Catalog, CatalogCategory, CatalogDocument, CatalogVisualization};
pub(crate) use catalog::to_slash;

/// Identifies one document of the knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub category: String,
    pub id: String,
    /// Display name, when the index source provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: PathBuf,
}

/// A top-level grouping of documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A static visualization page served next to the documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visualization {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

/// Immutable lookup table from `(category, id)` to a file path.
///
/// Documents keep the order in which they were added, and every operation
/// that walks the whole corpus reports results in that order.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    root: PathBuf,
    categories: Vec<Category>,
    documents: Vec<DocumentRef>,
    lookup: HashMap<(String, String), usize>,
    visualizations: Vec<Visualization>,
}

impl DocumentIndex {
    pub fn builder(root: impl AsRef<Path>) -> IndexBuilder {
        IndexBuilder::new(root)
    }

    /// The UGUI knowledge base layout shipped with the project
    pub fn builtin(root: impl AsRef<Path>) -> Self {
        let mut builder = Self::builder(root);

        builder
            .category("architecture", "UGUI Architecture & Principles")
            .document("architecture", "basic", "Docs/UGUI/UGUIArchitecture.md")
            .document("architecture", "detailed", "Docs/UGUI/UGUIDetailedArchitecture.md")
            .document("architecture", "complete", "Docs/UGUI/UGUICompleteArchitecture.md")
            .document("architecture", "system_relations", "Docs/UGUI/UGUISystemRelations.md")
            .document("architecture", "event_system", "Docs/UGUI/UGUI事件系统.md");

        builder
            .category("animation", "UGUI Interactive Animations")
            .document("animation", "index", "Docs/UGUI/UGUI交互式动画索引.md")
            .document("animation", "architecture", "Docs/UGUI/UGUI架构交互式动画.md")
            .document("animation", "sequence", "Docs/UGUI/UGUI时序交互式动画.md");

        builder
            .category("guide", "UGUI Usage Guides")
            .document("guide", "components", "Docs/Guide/UGUI组件使用指南.md")
            .document("guide", "animation_basic", "Docs/Guide/UGUI交互式动画指南.md")
            .document("guide", "animation_advanced", "Docs/Guide/UGUI交互式动画指南_高级部分.md")
            .document("guide", "animation_optimization", "Docs/Guide/UGUI交互式动画指南_优化.md");

        builder
            .category("best_practice", "UGUI Best Practices")
            .document("best_practice", "optimization", "Docs/UGUI/UGUI优化指南.md")
            .document("best_practice", "cursor_rules", "Docs/Guide/CursorRules.md");

        builder
            .visualization("architecture", "UGUI architecture diagram", "WebViewer/UGUIArchitectureViewer.html")
            .visualization("animation", "UGUI interactive animation", "WebViewer/UGUIAnimation.html")
            .visualization("documentation", "UGUI documentation viewer", "WebViewer/UGUIDocumentationViewer.html");

        builder.build()
    }

    /// Build an index from a parsed catalog file
    pub fn from_catalog(root: impl AsRef<Path>, catalog: &Catalog) -> Self {
        let mut builder = Self::builder(root);
        for category in &catalog.categories {
            builder.category(&category.id, category.name.as_deref().unwrap_or(&category.id));
            for doc in &category.documents {
                builder.named_document(&category.id, &doc.id, doc.name.as_deref(), &doc.path);
            }
        }
        for viz in &catalog.visualizations {
            builder.visualization(&viz.id, viz.name.as_deref().unwrap_or(&viz.id), &viz.path);
        }
        builder.build()
    }

    /// Build an index by discovering `<docs_dir>/<category>/*.md` files
    pub fn scan(root: impl AsRef<Path>, docs_dir: impl AsRef<Path>) -> Result<Self> {
        scan::scan_directory(root.as_ref(), docs_dir.as_ref())
    }

    /// Build an index from a markdown index document
    pub fn parse_index_document(root: impl AsRef<Path>, text: &str) -> Self {
        catalog::parse_index_document(root.as_ref(), text)
    }

    /// Exact `(category, id)` lookup
    pub fn resolve(&self, category: &str, id: &str) -> Result<&DocumentRef> {
        self.lookup
            .get(&(category.to_string(), id.to_string()))
            .map(|&i| &self.documents[i])
            .ok_or_else(|| KbError::document_not_found(category, id))
    }

    /// Every indexed document, in insertion order
    pub fn all(&self) -> &[DocumentRef] {
        &self.documents
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c.id == category)
    }

    /// Documents of one category, in insertion order
    pub fn documents(&self, category: &str) -> impl Iterator<Item = &DocumentRef> {
        self.documents.iter().filter(move |d| d.category == category)
    }

    /// Find a document by its path, either root-relative or as stored
    pub fn find_by_path(&self, path: &str) -> Option<&DocumentRef> {
        let joined = self.root.join(path);
        self.documents
            .iter()
            .find(|d| d.path == joined || d.path == Path::new(path))
    }

    pub fn visualizations(&self) -> &[Visualization] {
        &self.visualizations
    }

    pub fn resolve_visualization(&self, id: &str) -> Result<&Visualization> {
        self.visualizations
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| KbError::not_found("visualization", id))
    }

    /// Path of `path` relative to the index root, falling back to the file name
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
        }
    }
}

/// Accumulates index entries; the built index is immutable
pub struct IndexBuilder {
    root: PathBuf,
    categories: Vec<Category>,
    documents: Vec<DocumentRef>,
    lookup: HashMap<(String, String), usize>,
    visualizations: Vec<Visualization>,
}

impl IndexBuilder {
    fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            categories: Vec::new(),
            documents: Vec::new(),
            lookup: HashMap::new(),
            visualizations: Vec::new(),
        }
    }

    pub fn category(&mut self, id: &str, name: &str) -> &mut Self {
        if !self.categories.iter().any(|c| c.id == id) {
            self.categories.push(Category {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
        self
    }

    /// Add a document; relative paths are resolved against the root.
    /// A duplicate `(category, id)` keeps the first entry.
    pub fn document(&mut self, category: &str, id: &str, path: impl AsRef<Path>) -> &mut Self {
        self.named_document(category, id, None, path)
    }

    /// Add a document carrying a display name
    pub fn named_document(
        &mut self,
        category: &str,
        id: &str,
        name: Option<&str>,
        path: impl AsRef<Path>,
    ) -> &mut Self {
        let key = (category.to_string(), id.to_string());
        if self.lookup.contains_key(&key) {
            tracing::warn!("Duplicate document {}/{} ignored", category, id);
            return self;
        }

        self.category(category, category);
        self.lookup.insert(key, self.documents.len());
        self.documents.push(DocumentRef {
            category: category.to_string(),
            id: id.to_string(),
            name: name.map(str::to_string),
            path: self.root.join(path),
        });
        self
    }

    pub fn visualization(&mut self, id: &str, name: &str, path: impl AsRef<Path>) -> &mut Self {
        if self.visualizations.iter().any(|v| v.id == id) {
            tracing::warn!("Duplicate visualization {} ignored", id);
            return self;
        }

        self.visualizations.push(Visualization {
            id: id.to_string(),
            name: name.to_string(),
            path: self.root.join(path),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn build(self) -> DocumentIndex {
        DocumentIndex {
            root: self.root,
            categories: self.categories,
            documents: self.documents,
            lookup: self.lookup,
            visualizations: self.visualizations,
        }
    }
}
