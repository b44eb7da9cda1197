use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::http::{run_blocking, ApiError};
use super::{shutdown_signal, SharedKb};
use crate::error::{KbError, Result};
use crate::library::DynKnowledgeBase;

/// Body of a tool call: `{"args": {...}}`
#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Result of a tool call: `{"result": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolOutput {
    pub result: Value,
}

fn optional_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn required_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    optional_arg(args, key).ok_or_else(|| KbError::InvalidArgument(key.to_string()))
}

/// Execute one named tool against the knowledge base
pub fn dispatch(kb: &DynKnowledgeBase, tool: &str, args: &Map<String, Value>) -> Result<Value> {
    let value = match tool {
        "get_categories" => {
            let ids: Vec<&str> = kb.index().categories().iter().map(|c| c.id.as_str()).collect();
            serde_json::to_value(ids)?
        }
        "get_documents" => serde_json::to_value(kb.documents(required_arg(args, "category")?)?)?,
        "get_document_content" => {
            let view = match (optional_arg(args, "category"), optional_arg(args, "doc_id")) {
                (Some(category), Some(doc_id)) => kb.get_document(category, doc_id)?,
                (Some(_), None) => return Err(KbError::InvalidArgument("doc_id".to_string())),
                (None, Some(_)) => return Err(KbError::InvalidArgument("category".to_string())),
                (None, None) => kb.get_document_by_path(optional_arg(args, "path").unwrap_or_default())?,
            };
            serde_json::to_value(view)?
        }
        "search_documents" => serde_json::to_value(kb.search_previews(required_arg(args, "query")?)?)?,
        _ => return Err(KbError::not_found("tool", tool)),
    };
    Ok(value)
}

/// POST /mcp/tools/:tool
async fn call_tool(
    State(kb): State<SharedKb>,
    Path(tool): Path<String>,
    Json(input): Json<ToolInput>,
) -> std::result::Result<Json<ToolOutput>, ApiError> {
    tracing::debug!("Tool call {} with {} args", tool, input.args.len());
    let result = run_blocking(kb, move |kb| dispatch(kb, &tool, &input.args)).await?;
    Ok(Json(ToolOutput { result }))
}

/// GET /mcp/config
async fn config() -> Json<Value> {
    Json(json!({
        "name": "UGUI knowledge base tool server",
        "description": "Access to the UGUI knowledge base documents",
        "tools": [
            {
                "name": "get_categories",
                "description": "List all document categories",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "get_documents",
                "description": "List the documents of a category",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string", "description": "Category id" }
                    },
                    "required": ["category"]
                }
            },
            {
                "name": "get_document_content",
                "description": "Get a document by category and id, or by path",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string", "description": "Category id" },
                        "doc_id": { "type": "string", "description": "Document id" },
                        "path": { "type": "string", "description": "Document path relative to the knowledge base root" }
                    }
                }
            },
            {
                "name": "search_documents",
                "description": "Search documents for a keyword",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Keyword to search for" }
                    },
                    "required": ["query"]
                }
            }
        ]
    }))
}

pub fn router(kb: SharedKb) -> Router {
    Router::new()
        .route("/mcp/config", get(config))
        .route("/mcp/tools/:tool", post(call_tool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(kb)
}

pub async fn serve(kb: SharedKb, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Tool RPC server running at http://{}", addr);

    axum::serve(listener, router(kb))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
