use rmcp::model::{AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult, PaginatedRequestParam, ProtocolVersion, RawResource, Resource, ServerCapabilities, ServerInfo};
use serde_json::json;
use serde::Deserialize;

use rmcp::{
    Error as McpError, RoleServer, ServerHandler, model::*, schemars,
    service::RequestContext, tool,
};

use super::SharedKb;
use crate::error::KbError;
use crate::library::DynKnowledgeBase;

const RESOURCE_SCHEME: &str = "kb://";

#[derive(Clone)]
pub struct KnowledgeTools {
    pub kb: SharedKb,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AuthRequest {
    #[schemars(description = "API key, required when the server is configured with one")]
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CategoryRequest {
    #[schemars(description = "the document category id")]
    pub category: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocumentRequest {
    #[schemars(description = "the document category id")]
    pub category: String,
    #[schemars(description = "the document id within its category")]
    pub doc_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    #[schemars(description = "the keyword to search for, matched case-insensitively")]
    pub keyword: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct VisualizeRequest {
    #[schemars(description = "the visualization id")]
    pub diagram_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExampleRequest {
    #[schemars(description = "the code example id (file name without .cs)")]
    pub example_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn to_mcp_error(e: KbError) -> McpError {
    match &e {
        KbError::NotFound { .. } => McpError::resource_not_found(e.to_string(), None),
        KbError::InvalidArgument(_) => McpError::invalid_params(e.to_string(), None),
        _ => {
            tracing::error!("Tool call failed: {}", e);
            McpError::internal_error(e.to_string(), None)
        }
    }
}

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(value.to_string())]))
}

#[tool(tool_box)]
impl KnowledgeTools {

    pub fn new(kb: SharedKb, api_key: Option<String>) -> Self {
        Self {
            kb,
            api_key,
        }
    }

    fn authorize(&self, provided: Option<&str>) -> Result<(), McpError> {
        match &self.api_key {
            Some(expected) if provided != Some(expected.as_str()) => {
                tracing::warn!("Rejected tool call with invalid api key");
                Err(McpError::invalid_request("api key verification failed", None))
            }
            _ => Ok(()),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, McpError>
    where
        T: Send + 'static,
        F: FnOnce(&DynKnowledgeBase) -> crate::error::Result<T> + Send + 'static,
    {
        let kb = self.kb.clone();
        tokio::task::spawn_blocking(move || f(&kb))
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?
            .map_err(to_mcp_error)
    }

    #[tool(description = "List all document categories")]
    async fn categories(&self, #[tool(aggr)] AuthRequest { api_key }: AuthRequest) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        json_result(json!(self.kb.categories()))
    }

    #[tool(description = "List the documents of a category")]
    async fn documents(
        &self,
        #[tool(aggr)] CategoryRequest { category, api_key }: CategoryRequest,
    ) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        let docs = self.kb.documents(&category).map_err(to_mcp_error)?;
        json_result(json!(docs))
    }

    #[tool(description = "Get a document's markdown content and rendered HTML")]
    async fn document(
        &self,
        #[tool(aggr)] DocumentRequest { category, doc_id, api_key }: DocumentRequest,
    ) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        let view = self.blocking(move |kb| kb.get_document(&category, &doc_id)).await?;
        json_result(json!(view))
    }

    #[tool(description = "Search all documents for a keyword, returning matching lines with context")]
    async fn search(
        &self,
        #[tool(aggr)] SearchRequest { keyword, api_key }: SearchRequest,
    ) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        let response = self.blocking(move |kb| kb.search(&keyword)).await?;
        json_result(json!(response))
    }

    #[tool(description = "Search all documents for a keyword, returning a short preview per document")]
    async fn search_previews(
        &self,
        #[tool(aggr)] SearchRequest { keyword, api_key }: SearchRequest,
    ) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        let previews = self.blocking(move |kb| kb.search_previews(&keyword)).await?;
        json_result(json!(previews))
    }

    #[tool(description = "List all visualization pages")]
    async fn visualizations(&self, #[tool(aggr)] AuthRequest { api_key }: AuthRequest) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        json_result(json!(self.kb.visualizations()))
    }

    #[tool(description = "Get the file path of a visualization page")]
    async fn visualize(
        &self,
        #[tool(aggr)] VisualizeRequest { diagram_id, api_key }: VisualizeRequest,
    ) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        let viz = self.kb.visualization(&diagram_id).map_err(to_mcp_error)?;
        json_result(json!({
            "id": viz.id,
            "name": viz.name,
            "path": viz.path,
        }))
    }

    #[tool(description = "Get a C# code example from the project assets")]
    async fn example(
        &self,
        #[tool(aggr)] ExampleRequest { example_id, api_key }: ExampleRequest,
    ) -> Result<CallToolResult, McpError> {
        self.authorize(api_key.as_deref())?;
        let view = self.blocking(move |kb| kb.get_example(&example_id)).await?;
        json_result(json!(view))
    }
}


#[tool(tool_box)]
impl ServerHandler for KnowledgeTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("This server provides the UGUI knowledge base. Use 'categories' and 'documents' to browse, 'document' to fetch a document by category and id, 'search' to find matching lines for a keyword, and 'visualizations'/'visualize' for the diagram pages.".to_string()),
        }
    }

    async fn list_resources(
        &self,
        _request: PaginatedRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources: Vec<Resource> = self
            .kb
            .index()
            .all()
            .iter()
            .map(|doc| {
                let uri = format!("{RESOURCE_SCHEME}{}/{}", doc.category, doc.id);
                RawResource::new(uri, format!("{}/{}", doc.category, doc.id)).no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_document_resource(uri).await
    }
}

/// Split `kb://<category>/<id>` into its parts
fn parse_resource_uri(uri: &str) -> Option<(&str, &str)> {
    uri.strip_prefix(RESOURCE_SCHEME)
        .and_then(|rest| rest.split_once('/'))
        .filter(|(category, doc_id)| !category.is_empty() && !doc_id.is_empty())
}

impl KnowledgeTools {
    async fn read_document_resource(&self, uri: String) -> Result<ReadResourceResult, McpError> {
        let Some((category, doc_id)) = parse_resource_uri(&uri) else {
            return Err(McpError::resource_not_found(
                "resource_not_found",
                Some(json!({ "uri": uri })),
            ));
        };

        let (category, doc_id) = (category.to_string(), doc_id.to_string());
        let view = self.blocking(move |kb| kb.get_document(&category, &doc_id)).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(view.content, uri)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentIndex;
    use crate::library::KnowledgeBase;
    use crate::storage::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    fn tools(api_key: Option<&str>) -> KnowledgeTools {
        let mut builder = DocumentIndex::builder("/kb");
        builder.document("architecture", "basic", "Docs/UGUI/Arch.md");
        let mut store = MemoryStore::new(builder.build());
        store
            .insert("architecture", "basic", "# UGUI Architecture\nCanvas renders UI.\n")
            .unwrap();

        let store: Box<dyn DocumentStore> = Box::new(store);
        KnowledgeTools::new(Arc::new(KnowledgeBase::new(store)), api_key.map(str::to_string))
    }

    fn text_of(result: &CallToolResult) -> serde_json::Value {
        let value = serde_json::to_value(result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn api_key_is_checked_when_configured() {
        let tools = tools(Some("secret"));

        assert!(tools.authorize(Some("secret")).is_ok());

        let err = tools.authorize(Some("wrong")).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(err.message, "api key verification failed");

        assert!(tools.authorize(None).is_err());
    }

    #[test]
    fn api_key_is_optional_without_configuration() {
        let tools = tools(None);
        assert!(tools.authorize(None).is_ok());
        assert!(tools.authorize(Some("anything")).is_ok());
    }

    #[test]
    fn errors_map_to_protocol_codes() {
        let err = to_mcp_error(KbError::document_not_found("architecture", "missing"));
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);

        let err = to_mcp_error(KbError::InvalidArgument("keyword".to_string()));
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err = to_mcp_error(KbError::Remote { status: 503, message: "down".to_string() });
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn search_tool_returns_matches() {
        let tools = tools(None);

        let result = tools
            .search(SearchRequest { keyword: "canvas".to_string(), api_key: None })
            .await
            .unwrap();

        let body = text_of(&result);
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["matches"][0]["line"], 2);
    }

    #[tokio::test]
    async fn search_tool_rejects_empty_keyword() {
        let tools = tools(None);

        let err = tools
            .search(SearchRequest { keyword: String::new(), api_key: None })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn document_tool_reports_missing_document() {
        let tools = tools(None);

        let err = tools
            .document(DocumentRequest {
                category: "architecture".to_string(),
                doc_id: "missing".to_string(),
                api_key: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_reject_wrong_api_key() {
        let tools = tools(Some("secret"));

        let err = tools
            .search(SearchRequest { keyword: "canvas".to_string(), api_key: Some("nope".to_string()) })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn resource_uris_need_category_and_id() {
        assert_eq!(parse_resource_uri("kb://architecture/basic"), Some(("architecture", "basic")));
        assert_eq!(parse_resource_uri("kb://nocategory"), None);
        assert_eq!(parse_resource_uri("kb:///basic"), None);
        assert_eq!(parse_resource_uri("file://architecture/basic"), None);
    }

    #[tokio::test]
    async fn resources_read_document_content() {
        let tools = tools(None);

        let result = tools.read_document_resource("kb://architecture/basic".to_string()).await.unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["contents"][0]["text"], "# UGUI Architecture\nCanvas renders UI.\n");

        let err = tools.read_document_resource("kb://nocategory".to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);

        let err = tools.read_document_resource("kb://architecture/missing".to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }
}
