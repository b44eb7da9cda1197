use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{KbError, Result};
use crate::index::{to_slash, Catalog, DocumentIndex};
use crate::storage::MemoryStore;

/// Archive entry holding the index of the packed knowledge base
pub const CATALOG_ENTRY: &str = "catalog.json";
/// Archive entry describing the package for tool platforms
pub const MANIFEST_ENTRY: &str = "mcp_platform.json";

/// Package manifest written next to the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub run_mode: String,
    pub catalog: String,
    pub commands: Vec<String>,
}

impl Default for PackManifest {
    fn default() -> Self {
        Self {
            name: "ugui-kb".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Structured knowledge base for the Unity UGUI system (local mode)".to_string(),
            run_mode: "local".to_string(),
            catalog: CATALOG_ENTRY.to_string(),
            commands: [
                "categories",
                "documents",
                "document",
                "search",
                "visualizations",
                "visualize",
                "example",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

/// What ended up in the archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub documents: usize,
    pub visualizations: usize,
    pub skipped: usize,
}

/// Write the indexed documents, visualization pages, a catalog and a
/// manifest into a zip archive. Files missing on disk are skipped.
pub fn pack(index: &DocumentIndex, output: &Path) -> Result<PackSummary> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(File::create(output)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut written = HashSet::new();
    let mut summary = PackSummary::default();

    let doc_paths = index.all().iter().map(|d| (&d.path, true));
    let viz_paths = index.visualizations().iter().map(|v| (&v.path, false));

    for (path, is_document) in doc_paths.chain(viz_paths) {
        let name = to_slash(&index.relative_path(path));
        if !written.insert(name.clone()) {
            continue;
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                summary.skipped += 1;
                continue;
            }
        };

        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;

        if is_document {
            summary.documents += 1;
        } else {
            summary.visualizations += 1;
        }
    }

    let catalog = serde_json::to_vec_pretty(&Catalog::from_index(index))?;
    zip.start_file(CATALOG_ENTRY, options)?;
    zip.write_all(&catalog)?;

    let manifest = serde_json::to_vec_pretty(&PackManifest::default())?;
    zip.start_file(MANIFEST_ENTRY, options)?;
    zip.write_all(&manifest)?;

    zip.finish()?;

    tracing::info!(
        "Packed {} documents and {} visualizations into {:?} ({} skipped)",
        summary.documents,
        summary.visualizations,
        output,
        summary.skipped
    );
    Ok(summary)
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(entry) => Ok(Some(io::read_to_string(entry)?)),
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load an archive written by [`pack`] into a memory store.
///
/// The archive path acts as the index root, so document paths read as
/// `<archive>/<entry>`. Only documents are loaded; visualization pages and
/// code examples stay in the archive.
pub fn load_bundle(archive_path: &Path) -> Result<MemoryStore> {
    let file = File::open(archive_path).map_err(|source| KbError::Read {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file)?;

    let catalog = read_entry(&mut archive, CATALOG_ENTRY)?
        .ok_or_else(|| KbError::not_found("bundle entry", CATALOG_ENTRY))?;
    let catalog: Catalog = serde_json::from_str(&catalog)?;
    let index = DocumentIndex::from_catalog(archive_path, &catalog);

    let mut store = MemoryStore::new(index.clone());
    for doc in index.all() {
        let name = to_slash(&index.relative_path(&doc.path));
        match read_entry(&mut archive, &name)? {
            Some(content) => store.insert(&doc.category, &doc.id, content)?,
            None => tracing::warn!("Bundle has no entry {} for {}/{}", name, doc.category, doc.id),
        }
    }

    tracing::info!("Loaded {} documents from bundle {:?}", index.all().len(), archive_path);
    Ok(store)
}
