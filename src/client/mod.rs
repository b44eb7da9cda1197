use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use crate::document::{DocumentView, ExampleView};
use crate::error::{KbError, Result};
use crate::library::{DynKnowledgeBase, IndexOverview};
use crate::search::SearchResponse;

/// Default address of the REST API server
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Knowledge base access used by the command-line client
#[async_trait]
pub trait KbClient: Send + Sync {
    async fn index(&self) -> Result<IndexOverview>;

    async fn document(&self, category: &str, doc_id: &str) -> Result<DocumentView>;

    async fn search(&self, keyword: &str) -> Result<SearchResponse>;

    async fn example(&self, example_id: &str) -> Result<ExampleView>;

    /// Location of a visualization page, a file path or a URL
    async fn visualization(&self, diagram_id: &str) -> Result<String>;
}

/// Client answering from an in-process knowledge base
pub struct LocalClient {
    kb: Arc<DynKnowledgeBase>,
}

impl LocalClient {
    pub fn new(kb: Arc<DynKnowledgeBase>) -> Self {
        Self { kb }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DynKnowledgeBase) -> Result<T> + Send + 'static,
    {
        let kb = self.kb.clone();
        tokio::task::spawn_blocking(move || f(&kb))
            .await
            .map_err(|e| KbError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl KbClient for LocalClient {
    async fn index(&self) -> Result<IndexOverview> {
        Ok(self.kb.get_index())
    }

    async fn document(&self, category: &str, doc_id: &str) -> Result<DocumentView> {
        let (category, doc_id) = (category.to_string(), doc_id.to_string());
        self.blocking(move |kb| kb.get_document(&category, &doc_id)).await
    }

    async fn search(&self, keyword: &str) -> Result<SearchResponse> {
        let keyword = keyword.to_string();
        self.blocking(move |kb| kb.search(&keyword)).await
    }

    async fn example(&self, example_id: &str) -> Result<ExampleView> {
        let example_id = example_id.to_string();
        self.blocking(move |kb| kb.get_example(&example_id)).await
    }

    async fn visualization(&self, diagram_id: &str) -> Result<String> {
        let viz = self.kb.visualization(diagram_id)?;
        if !viz.path.is_file() {
            return Err(KbError::not_found("visualization", diagram_id));
        }
        Ok(viz.path.display().to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client talking to a running REST API server
pub struct HttpClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| KbError::InvalidArgument(format!("base_url ({e})")))?;
        if base_url.cannot_be_a_base() {
            return Err(KbError::InvalidArgument(format!("base_url ({base_url})")));
        }

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };

        Err(match status.as_u16() {
            404 => KbError::not_found("remote resource", message),
            400 => KbError::InvalidArgument(message),
            code => KbError::Remote { status: code, message },
        })
    }
}

#[async_trait]
impl KbClient for HttpClient {
    async fn index(&self) -> Result<IndexOverview> {
        self.get(self.url(&["api", "index"]), &[]).await
    }

    async fn document(&self, category: &str, doc_id: &str) -> Result<DocumentView> {
        self.get(self.url(&["api", "docs", category, doc_id]), &[]).await
    }

    async fn search(&self, keyword: &str) -> Result<SearchResponse> {
        self.get(self.url(&["api", "search"]), &[("keyword", keyword)]).await
    }

    async fn example(&self, example_id: &str) -> Result<ExampleView> {
        self.get(self.url(&["api", "examples", example_id]), &[]).await
    }

    async fn visualization(&self, diagram_id: &str) -> Result<String> {
        let index = self.index().await?;
        if !index.visualizations.iter().any(|v| v == diagram_id) {
            return Err(KbError::not_found("visualization", diagram_id));
        }
        Ok(self.url(&["api", "visualize", diagram_id]).to_string())
    }
}
