use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::DocumentIndex;
use crate::error::{KbError, Result};

const DEFAULT_CATEGORY: &str = "general";

/// On-disk description of the knowledge base layout.
///
/// Entries are arrays so the file order becomes the index order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<CatalogCategory>,
    #[serde(default)]
    pub visualizations: Vec<CatalogVisualization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub documents: Vec<CatalogDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogVisualization {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
}

impl Catalog {
    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| KbError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = serde_json::from_reader(BufReader::new(file))?;
        Ok(catalog)
    }

    /// Describe an index, with paths relative to its root
    pub fn from_index(index: &DocumentIndex) -> Self {
        let categories = index
            .categories()
            .iter()
            .map(|category| CatalogCategory {
                id: category.id.clone(),
                name: Some(category.name.clone()),
                documents: index
                    .documents(&category.id)
                    .map(|doc| CatalogDocument {
                        id: doc.id.clone(),
                        name: doc.name.clone(),
                        path: to_slash(&index.relative_path(&doc.path)),
                    })
                    .collect(),
            })
            .collect();

        let visualizations = index
            .visualizations()
            .iter()
            .map(|viz| CatalogVisualization {
                id: viz.id.clone(),
                name: Some(viz.name.clone()),
                path: to_slash(&index.relative_path(&viz.path)),
            })
            .collect();

        Self {
            categories,
            visualizations,
        }
    }
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse table rows of the form `| doc_id | name | [title](path) |`.
///
/// The category of a row is the closest `## ` heading above it.
pub(super) fn parse_index_document(root: &Path, text: &str) -> DocumentIndex {
    let mut builder = DocumentIndex::builder(root);
    let mut category = DEFAULT_CATEGORY.to_string();

    // The pattern is a literal and always compiles
    let link = Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").ok();

    for line in text.lines() {
        let line = line.trim();

        if let Some(heading) = line.strip_prefix("## ") {
            category = slugify(heading);
            continue;
        }

        if !line.starts_with('|') {
            continue;
        }

        let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
        if cells.len() < 3 {
            continue;
        }

        let doc_id = cells[0];
        if doc_id.is_empty() || doc_id.chars().all(|c| c == '-' || c == ':') {
            continue;
        }

        let Some(path) = link
            .as_ref()
            .and_then(|re| re.captures(cells[2]))
            .map(|cap| cap[1].to_string())
        else {
            continue;
        };

        let name = Some(cells[1]).filter(|n| !n.is_empty());
        builder.named_document(&category, doc_id, name, path);
    }

    tracing::debug!("Parsed {} documents from index document", builder.len());
    builder.build()
}

fn slugify(heading: &str) -> String {
    let slug: String = heading
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        slug
    }
}
