use std::path::Path;
use walkdir::WalkDir;

use super::DocumentIndex;
use crate::error::{KbError, Result};

const SUPPORTED_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Directory holding the static visualization pages, relative to the root
const VIEWER_DIR: &str = "WebViewer";

/// Check if a file is a supported documentation file
fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_dir(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
}

/// Every immediate subdirectory of `docs_dir` is a category, every markdown
/// file directly inside it a document named after its file stem. HTML pages
/// in `<root>/WebViewer` become visualizations.
pub(super) fn scan_directory(root: &Path, docs_dir: &Path) -> Result<DocumentIndex> {
    if !docs_dir.is_dir() {
        return Err(KbError::not_found("directory", docs_dir.display().to_string()));
    }

    let mut builder = DocumentIndex::builder(root);

    let category_dirs = list_dir(docs_dir).filter(|e| e.file_type().is_dir());
    for category_dir in category_dirs {
        let Some(category) = category_dir.file_name().to_str().map(str::to_string) else {
            continue;
        };
        builder.category(&category, &category);

        let files = list_dir(category_dir.path())
            .filter(|e| e.file_type().is_file() && is_supported_file(e.path()));

        for file in files {
            let Some(stem) = file.path().file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let relative = file.path().strip_prefix(root).unwrap_or(file.path());
            builder.document(&category, stem, relative);
        }
    }

    let viewer_dir = root.join(VIEWER_DIR);
    if viewer_dir.is_dir() {
        let pages = list_dir(&viewer_dir).filter(|e| {
            e.file_type().is_file()
                && e.path().extension().and_then(|ext| ext.to_str()) == Some("html")
        });
        for page in pages {
            let Some(stem) = page.path().file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            builder.visualization(stem, stem, Path::new(VIEWER_DIR).join(page.file_name()));
        }
    }

    tracing::info!("Discovered {} documents under {:?}", builder.len(), docs_dir);
    Ok(builder.build())
}
