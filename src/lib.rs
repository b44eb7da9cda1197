//! # UGUI Knowledge Base
//!
//! Serves a knowledge base of markdown documents about Unity's UGUI system,
//! lets callers search their text, and exposes the static visualization pages
//! that ship with it.
//!
//! ## Features
//!
//! - A fixed document index, loadable from a JSON catalog, a markdown index
//!   document, or a directory scan
//! - Case-insensitive keyword search with per-line context
//! - Markdown to HTML rendering for fetched documents
//! - REST, tool-call RPC and MCP adapters over the same core
//!
//! ## Modules
//!
//! - `index`: the `(category, id) -> path` lookup table
//! - `storage`: document stores reading through the index
//! - `document`: rendering and title/preview helpers
//! - `search`: the keyword search engine
//! - `library`: the knowledge base facade used by every adapter
//! - `server`: HTTP, RPC, MCP and static file servers
//! - `client`: local and remote clients for the command line
//! - `pack`: zip packaging of the knowledge base

/// Error types
pub mod error;
/// Document index
pub mod index;
/// Document storage and retrieval
pub mod storage;
/// Document rendering and metadata
pub mod document;
/// Keyword search
pub mod search;
/// Knowledge base facade
pub mod library;
/// Server implementations
pub mod server;
/// Command-line clients
pub mod client;
/// Knowledge base packaging
pub mod pack;

pub use error::{KbError, Result};
pub use index::{DocumentIndex, DocumentRef};
pub use library::{DynKnowledgeBase, KnowledgeBase};
pub use storage::{DocumentStore, FsStore, MemoryStore};
