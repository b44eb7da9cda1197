use std::fs;
use std::path::Path;

use ugui_kb_rs::{DocumentIndex, KbError, KnowledgeBase};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn knowledge_base(root: &Path) -> KnowledgeBase {
    write(root, "Docs/UGUI/Arch.md", "# UGUI Architecture\nCanvas renders UI.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
    write(root, "Assets/Scripts/UIManager.cs", "public class UIManager {}");

    let mut builder = DocumentIndex::builder(root);
    builder
        .category("architecture", "Architecture")
        .document("architecture", "basic", "Docs/UGUI/Arch.md")
        .document("architecture", "gone", "Docs/UGUI/Gone.md")
        .visualization("architecture", "Architecture viewer", "WebViewer/Arch.html");
    KnowledgeBase::open(builder.build())
}

#[test]
fn test_get_document_renders_html() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = knowledge_base(temp_dir.path());

    let doc = kb.get_document("architecture", "basic").unwrap();

    assert_eq!(doc.id, "basic");
    assert_eq!(doc.category, "architecture");
    assert!(doc.content.starts_with("# UGUI Architecture"));
    assert!(doc.html_content.contains("<h1>UGUI Architecture</h1>"));
    assert!(doc.html_content.contains("<table>"));
}

#[test]
fn test_get_missing_document_is_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = knowledge_base(temp_dir.path());

    let err = kb.get_document("architecture", "missing").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);
    assert!(err.to_string().contains("document not found"));

    // Indexed but absent on disk surfaces as a read error
    let err = kb.get_document("architecture", "gone").unwrap_err();
    assert!(matches!(err, KbError::Read { .. }));

    // Empty keys are argument errors
    assert!(matches!(kb.get_document("", "basic"), Err(KbError::InvalidArgument(_))));
}

#[test]
fn test_get_document_by_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = knowledge_base(temp_dir.path());

    let doc = kb.get_document_by_path("Docs/UGUI/Arch.md").unwrap();
    assert_eq!(doc.id, "basic");

    assert!(kb.get_document_by_path("Docs/Nope.md").unwrap_err().is_not_found());
    assert!(matches!(kb.get_document_by_path(""), Err(KbError::InvalidArgument(_))));
}

#[test]
fn test_listings_and_index_overview() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = knowledge_base(temp_dir.path());

    let categories = kb.categories();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Architecture");
    assert_eq!(categories[0].documents, 2);

    let docs = kb.documents("architecture").unwrap();
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["basic", "gone"]);
    assert!(kb.documents("guide").unwrap_err().is_not_found());

    let overview = kb.get_index();
    assert_eq!(overview.categories, ["architecture"]);
    assert_eq!(overview.documents["architecture"].len(), 2);
    assert_eq!(overview.visualizations, ["architecture"]);
}

#[test]
fn test_get_example() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = knowledge_base(temp_dir.path());

    let example = kb.get_example("UIManager").unwrap();
    assert_eq!(example.id, "UIManager");
    assert_eq!(example.content, "public class UIManager {}");

    assert!(kb.get_example("Missing").unwrap_err().is_not_found());
    assert!(matches!(kb.get_example("../Docs/UGUI/Arch"), Err(KbError::InvalidArgument(_))));
    assert!(matches!(kb.get_example(""), Err(KbError::InvalidArgument(_))));
}

#[test]
fn test_visualization_lookup() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = knowledge_base(temp_dir.path());

    let viz = kb.visualization("architecture").unwrap();
    assert_eq!(viz.path, temp_dir.path().join("WebViewer/Arch.html"));
    assert!(kb.visualization("timeline").unwrap_err().is_not_found());
}
