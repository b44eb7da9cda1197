use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{shutdown_signal, SharedKb};
use crate::document::{DocumentView, ExampleView};
use crate::error::{KbError, Result};
use crate::library::{DynKnowledgeBase, IndexOverview};
use crate::search::SearchResponse;

/// Knowledge base error rendered as `{"error": ...}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub KbError);

impl From<KbError> for ApiError {
    fn from(e: KbError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Run a knowledge base call on the blocking pool; every call reads files
pub async fn run_blocking<T, F>(kb: SharedKb, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&DynKnowledgeBase) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&kb))
        .await
        .map_err(|e| ApiError(KbError::Io(std::io::Error::other(e))))?
        .map_err(ApiError)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
}

/// GET /api/health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/index
async fn get_index(State(kb): State<SharedKb>) -> Json<IndexOverview> {
    Json(kb.get_index())
}

/// GET /api/docs/:category/:doc_id
async fn get_document(
    State(kb): State<SharedKb>,
    Path((category, doc_id)): Path<(String, String)>,
) -> ApiResult<DocumentView> {
    run_blocking(kb, move |kb| kb.get_document(&category, &doc_id))
        .await
        .map(Json)
}

/// GET /api/search?keyword=
async fn search(
    State(kb): State<SharedKb>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    let keyword = params
        .keyword
        .ok_or_else(|| KbError::InvalidArgument("keyword".to_string()))?;
    run_blocking(kb, move |kb| kb.search(&keyword)).await.map(Json)
}

/// GET /api/visualize/:diagram_id
async fn visualize(
    State(kb): State<SharedKb>,
    Path(diagram_id): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let path = kb.visualization(&diagram_id)?.path.clone();
    let page = match tokio::fs::read(&path).await {
        Ok(page) => page,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(KbError::not_found("visualization", diagram_id).into());
        }
        Err(source) => return Err(KbError::Read { path, source }.into()),
    };

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        page,
    )
        .into_response())
}

/// GET /api/examples/:example_id
async fn get_example(
    State(kb): State<SharedKb>,
    Path(example_id): Path<String>,
) -> ApiResult<ExampleView> {
    run_blocking(kb, move |kb| kb.get_example(&example_id))
        .await
        .map(Json)
}

pub fn router(kb: SharedKb) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/index", get(get_index))
        .route("/api/docs/:category/:doc_id", get(get_document))
        .route("/api/search", get(search))
        .route("/api/visualize/:diagram_id", get(visualize))
        .route("/api/examples/:example_id", get(get_example))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(kb)
}

pub async fn serve(kb: SharedKb, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server running at http://{}", addr);

    axum::serve(listener, router(kb))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
