//! Pagekit Script Loader
//!
//! Loads external scripts into a document at most once per URL, with optional
//! preload staging and sequential or parallel batches.
//!
//! The loader never touches a document directly: it talks to a
//! [`ScriptHost`], which owns the document and reports each script's
//! `load`/`error` outcome. [`MemoryHost`] settles loads on demand for tests,
//! [`FetchHost`] fetches scripts over HTTP.

mod options;
mod registry;
mod host;
mod memory;
mod fetch;
mod loader;

pub use options::{ScriptLoadOptions, ScriptTag, DEFAULT_PRELOAD_TIMEOUT_MS};
pub use registry::LoadedScriptRegistry;
pub use host::{ScriptHost, PendingLoad, LoadEvent};
pub use memory::{MemoryHost, HostMode};
pub use fetch::FetchHost;
pub use loader::{ScriptLoader, ScriptElement};
pub use pagekit_dom::{Document, NodeId};

use pagekit_dom::DomError;

/// Script loader error
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("script src must not be empty")]
    EmptySrc,

    #[error("failed to load script {src}: {reason}")]
    LoadFailed { src: String, reason: String },

    #[error("script load abandoned before completion: {src}")]
    Abandoned { src: String },

    #[error("invalid script URL {src}: {reason}")]
    InvalidUrl { src: String, reason: String },

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("invalid loader options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
