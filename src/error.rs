use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the knowledge base and its adapters
#[derive(Debug, Error)]
pub enum KbError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("missing required parameter: {0}")]
    InvalidArgument(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote server returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl KbError {
    pub fn document_not_found(category: &str, id: &str) -> Self {
        Self::NotFound {
            kind: "document",
            key: format!("{category}/{id}"),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status code equivalent of this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidArgument(_) => 400,
            Self::Http(_) | Self::Remote { .. } => 502,
            Self::Read { .. } | Self::Io(_) | Self::Json(_) | Self::Archive(_) => 500,
        }
    }
}

pub type Result<T, E = KbError> = std::result::Result<T, E>;
