use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::shutdown_signal;
use crate::index::{to_slash, DocumentIndex};

/// Serve every file under `root` as-is
pub fn router(root: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(TraceLayer::new_for_http())
}

/// URLs of the visualization pages as served from the index root
pub fn viewer_urls(index: &DocumentIndex, addr: SocketAddr) -> Vec<(String, String)> {
    index
        .visualizations()
        .iter()
        .map(|viz| {
            let relative = to_slash(&index.relative_path(&viz.path));
            (viz.name.clone(), format!("http://localhost:{}/{}", addr.port(), relative))
        })
        .collect()
}

pub async fn serve(root: PathBuf, index: &DocumentIndex, addr: SocketAddr) -> anyhow::Result<()> {
    if !root.is_dir() {
        anyhow::bail!("web root does not exist: {}", root.display());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web viewer serving {:?} at http://{}", root, addr);
    for (name, url) in viewer_urls(index, addr) {
        tracing::info!("{}: {}", name, url);
    }

    axum::serve(listener, router(&root))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
