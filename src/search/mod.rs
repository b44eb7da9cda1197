//! Case-insensitive keyword search over every indexed document.
//!
//! Matching is plain substring containment after lower-casing both sides.
//! There is no ranking: results follow index order and line order.

use serde::{Deserialize, Serialize};

use crate::document::{derive_title, preview};
use crate::error::{KbError, Result};
use crate::index::DocumentRef;
use crate::storage::DocumentStore;

/// Lines of context kept on each side of a matching line
const CONTEXT_LINES: usize = 2;

/// One matching line and the lines around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// 1-based line number
    pub line: usize,
    pub context: String,
}

/// All matches inside one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub category: String,
    pub title: String,
    pub path: String,
    pub matches: Vec<SearchMatch>,
}

/// Outcome of one search call; `count` is the number of matching documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub keyword: String,
    pub count: usize,
    pub results: Vec<SearchResult>,
}

/// Short listing entry used by the tool-call surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPreview {
    pub category: String,
    pub name: String,
    pub path: String,
    pub preview: String,
}

fn require_keyword(keyword: &str) -> Result<String> {
    if keyword.is_empty() {
        return Err(KbError::InvalidArgument("keyword".to_string()));
    }
    Ok(keyword.to_lowercase())
}

/// Scan lines of `content` for `needle`, which must already be lower-cased
pub fn find_matches(content: &str, needle: &str) -> Vec<SearchMatch> {
    let lines: Vec<&str> = content.split('\n').collect();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.to_lowercase().contains(needle))
        .map(|(i, _)| {
            let start = i.saturating_sub(CONTEXT_LINES);
            let end = (i + CONTEXT_LINES + 1).min(lines.len());
            SearchMatch {
                line: i + 1,
                context: lines[start..end].join("\n"),
            }
        })
        .collect()
}

/// Read a document for a bulk operation; failures are logged and skipped
fn read_for_scan<S: DocumentStore + ?Sized>(store: &S, doc: &DocumentRef) -> Option<String> {
    match store.read(doc) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!("Error searching document {:?}: {}", doc.path, e);
            None
        }
    }
}

/// Search every indexed document for `keyword`.
///
/// An empty keyword is rejected before any document is read.
pub fn search<S: DocumentStore + ?Sized>(store: &S, keyword: &str) -> Result<SearchResponse> {
    let needle = require_keyword(keyword)?;

    let results: Vec<SearchResult> = store
        .all()
        .iter()
        .filter_map(|doc| {
            let content = read_for_scan(store, doc)?;
            let matches = find_matches(&content, &needle);
            if matches.is_empty() {
                return None;
            }
            Some(SearchResult {
                id: doc.id.clone(),
                category: doc.category.clone(),
                title: derive_title(&content),
                path: doc.path.display().to_string(),
                matches,
            })
        })
        .collect();

    tracing::debug!("Search for {:?} matched {} documents", keyword, results.len());

    Ok(SearchResponse {
        keyword: keyword.to_string(),
        count: results.len(),
        results,
    })
}

/// Search returning a short preview per matching document instead of line matches
pub fn search_previews<S: DocumentStore + ?Sized>(store: &S, query: &str) -> Result<Vec<DocumentPreview>> {
    let needle = require_keyword(query)?;
    let index = store.index();

    let previews = store
        .all()
        .iter()
        .filter_map(|doc| {
            let content = read_for_scan(store, doc)?;
            if !content.to_lowercase().contains(&needle) {
                return None;
            }
            let name = doc
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| doc.id.clone());
            Some(DocumentPreview {
                category: doc.category.clone(),
                name,
                path: crate::index::to_slash(&index.relative_path(&doc.path)),
                preview: preview(&content),
            })
        })
        .collect();

    Ok(previews)
}
