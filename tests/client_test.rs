use std::fs;
use std::path::Path;
use std::sync::Arc;

use ugui_kb_rs::client::{HttpClient, KbClient, LocalClient};
use ugui_kb_rs::server::{http, SharedKb};
use ugui_kb_rs::{DocumentIndex, DocumentStore, FsStore, KnowledgeBase};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn shared_kb(root: &Path) -> SharedKb {
    write(root, "Docs/UGUI/Arch.md", "# UGUI Architecture\nCanvas renders UI.\n");
    write(root, "WebViewer/Arch.html", "<html></html>");
    write(root, "Assets/Scripts/UIManager.cs", "public class UIManager {}");

    let mut builder = DocumentIndex::builder(root);
    builder
        .document("architecture", "basic", "Docs/UGUI/Arch.md")
        .visualization("architecture", "Architecture", "WebViewer/Arch.html");

    let store: Box<dyn DocumentStore> = Box::new(FsStore::new(builder.build()));
    Arc::new(KnowledgeBase::new(store))
}

/// Serve the REST API on an ephemeral port and return its base URL
async fn spawn_api(kb: SharedKb) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::router(kb)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_local_client() {
    let temp_dir = tempfile::tempdir().unwrap();
    let client = LocalClient::new(shared_kb(temp_dir.path()));

    let index = client.index().await.unwrap();
    assert_eq!(index.categories, ["architecture"]);

    let doc = client.document("architecture", "basic").await.unwrap();
    assert!(doc.html_content.contains("<h1>UGUI Architecture</h1>"));

    let example = client.example("UIManager").await.unwrap();
    assert_eq!(example.content, "public class UIManager {}");

    let page = client.visualization("architecture").await.unwrap();
    assert!(page.ends_with("Arch.html"));

    assert!(client.document("architecture", "missing").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_http_client_matches_local_client() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kb = shared_kb(temp_dir.path());
    let local = LocalClient::new(kb.clone());
    let remote = HttpClient::new(&spawn_api(kb).await).unwrap();

    assert_eq!(remote.index().await.unwrap(), local.index().await.unwrap());
    assert_eq!(
        remote.search("canvas").await.unwrap(),
        local.search("canvas").await.unwrap()
    );

    let doc = remote.document("architecture", "basic").await.unwrap();
    assert_eq!(doc.content, "# UGUI Architecture\nCanvas renders UI.\n");

    // Remote errors keep their kind
    assert!(remote.document("architecture", "missing").await.unwrap_err().is_not_found());
    assert_eq!(remote.search("").await.unwrap_err().status_code(), 400);

    let url = remote.visualization("architecture").await.unwrap();
    assert!(url.ends_with("/api/visualize/architecture"));
}

#[test]
fn test_http_client_rejects_bad_base_url() {
    assert!(HttpClient::new("not a url").is_err());
}
