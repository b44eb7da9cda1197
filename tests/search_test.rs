use std::fs;
use std::path::Path;

use ugui_kb_rs::document::UNKNOWN_TITLE;
use ugui_kb_rs::search::{self, find_matches};
use ugui_kb_rs::{DocumentIndex, DocumentRef, DocumentStore, FsStore, KbError, MemoryStore, Result};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Store that fails the test if anything is read
struct NoReadStore {
    index: DocumentIndex,
}

impl DocumentStore for NoReadStore {
    fn index(&self) -> &DocumentIndex {
        &self.index
    }

    fn read(&self, doc: &DocumentRef) -> Result<String> {
        panic!("unexpected read of {:?}", doc.path);
    }
}

fn memory_store(docs: &[(&str, &str, &str)]) -> MemoryStore {
    let mut builder = DocumentIndex::builder("/kb");
    for (category, id, _) in docs {
        builder.document(category, id, format!("Docs/{category}/{id}.md"));
    }
    let mut store = MemoryStore::new(builder.build());
    for (category, id, content) in docs {
        store.insert(category, id, *content).unwrap();
    }
    store
}

#[test]
fn test_search_end_to_end_on_disk() {
    // Create a knowledge base with one document
    let temp_dir = tempfile::tempdir().unwrap();
    write(temp_dir.path(), "Docs/UGUI/UGUIArchitecture.md", "# UGUI Architecture\nCanvas renders UI.\n");

    let mut builder = DocumentIndex::builder(temp_dir.path());
    builder.document("architecture", "basic", "Docs/UGUI/UGUIArchitecture.md");
    let store = FsStore::new(builder.build());

    // Search with a lower-case keyword
    let response = search::search(&store, "canvas").unwrap();

    assert_eq!(response.keyword, "canvas");
    assert_eq!(response.count, 1);
    let result = &response.results[0];
    assert_eq!(result.id, "basic");
    assert_eq!(result.category, "architecture");
    assert_eq!(result.title, "UGUI Architecture");
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].line, 2);
    assert!(result.matches[0].context.contains("# UGUI Architecture"));
    assert!(result.matches[0].context.contains("Canvas renders UI."));
}

#[test]
fn test_search_is_case_insensitive_and_in_index_order() {
    let store = memory_store(&[
        ("guide", "first", "# First\nnothing here"),
        ("guide", "second", "# Second\nUses a CANVAS group"),
        ("architecture", "third", "canvas on line one"),
    ]);

    let response = search::search(&store, "CanVas").unwrap();

    let ids: Vec<_> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["second", "third"]);
    assert_eq!(response.count, 2);
    assert_eq!(response.results[1].title, UNKNOWN_TITLE);
}

#[test]
fn test_count_is_documents_not_lines() {
    let store = memory_store(&[("guide", "many", "button\nbutton\nbutton")]);

    let response = search::search(&store, "button").unwrap();

    assert_eq!(response.count, 1);
    let lines: Vec<_> = response.results[0].matches.iter().map(|m| m.line).collect();
    assert_eq!(lines, [1, 2, 3]);
}

#[test]
fn test_search_without_matches_is_empty() {
    let store = memory_store(&[("guide", "a", "# A\nImage"), ("guide", "b", "Text")]);

    let response = search::search(&store, "ScrollRect").unwrap();

    assert_eq!(response.count, 0);
    assert!(response.results.is_empty());
}

#[test]
fn test_empty_keyword_is_rejected_without_reading() {
    let mut builder = DocumentIndex::builder("/kb");
    builder.document("guide", "a", "a.md");
    let store = NoReadStore { index: builder.build() };

    let err = search::search(&store, "").unwrap_err();
    assert!(matches!(err, KbError::InvalidArgument(_)));
    assert_eq!(err.status_code(), 400);

    let err = search::search_previews(&store, "").unwrap_err();
    assert!(matches!(err, KbError::InvalidArgument(_)));
}

#[test]
fn test_unreadable_document_is_skipped() {
    let temp_dir = tempfile::tempdir().unwrap();
    write(temp_dir.path(), "Docs/good.md", "# Good\nLayout group");

    let mut builder = DocumentIndex::builder(temp_dir.path());
    builder.document("guide", "missing", "Docs/missing.md");
    builder.document("guide", "good", "Docs/good.md");
    let store = FsStore::new(builder.build());

    let response = search::search(&store, "layout").unwrap();

    assert_eq!(response.count, 1);
    assert_eq!(response.results[0].id, "good");
}

#[test]
fn test_context_window_is_clipped_at_boundaries() {
    // Single line document
    let matches = find_matches("only canvas", "canvas");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].context, "only canvas");

    // Match in the middle keeps two lines on each side
    let text = "l1\nl2\nl3\nhit\nl5\nl6\nl7";
    let matches = find_matches(text, "hit");
    assert_eq!(matches[0].line, 4);
    assert_eq!(matches[0].context, "l2\nl3\nhit\nl5\nl6");

    // Match on the first and last lines
    let text = "hit\nl2\nl3\nl4\nhit";
    let matches = find_matches(text, "hit");
    assert_eq!(matches[0].context, "hit\nl2\nl3");
    assert_eq!(matches[1].line, 5);
    assert_eq!(matches[1].context, "l3\nl4\nhit");
}

#[test]
fn test_title_only_from_first_ten_lines() {
    let late_title = format!("{}# Too Late\ncanvas", "filler\n".repeat(10));
    let store = memory_store(&[
        ("guide", "late", late_title.as_str()),
        ("guide", "sub", "## Sub heading\n# Real Title\ncanvas"),
    ]);

    let response = search::search(&store, "canvas").unwrap();

    assert_eq!(response.results[0].title, UNKNOWN_TITLE);
    assert_eq!(response.results[1].title, "Real Title");
}

#[test]
fn test_search_previews() {
    let long_body = format!("# Long\n{}", "x".repeat(300));
    let store = memory_store(&[
        ("guide", "short", "# Short\nRectTransform basics"),
        ("guide", "long", long_body.as_str()),
    ]);

    let previews = search::search_previews(&store, "recttransform").unwrap();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].category, "guide");
    assert_eq!(previews[0].name, "short");
    assert_eq!(previews[0].path, "Docs/guide/short.md");
    assert_eq!(previews[0].preview, "# Short\nRectTransform basics");

    let previews = search::search_previews(&store, "# long").unwrap();
    assert_eq!(previews.len(), 1);
    assert!(previews[0].preview.ends_with("..."));
    assert_eq!(previews[0].preview.chars().count(), 203);
}
