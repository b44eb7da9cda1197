use std::sync::Arc;

use crate::library::DynKnowledgeBase;

/// REST API over the knowledge base
pub mod http;
/// Tool-call RPC API
pub mod rpc;
/// MCP stdio tool server
pub mod tools;
/// Static file server for the visualization pages
pub mod web;

/// Knowledge base shared by every request handler
pub type SharedKb = Arc<DynKnowledgeBase>;

/// Resolves when the process receives Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
