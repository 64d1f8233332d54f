use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Catalog error: {0}")]
    CatalogError(#[from] nexus_catalog::CatalogError),

    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Matching service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed matcher response: {0}")]
    MalformedResponse(String),

    #[error("Semantic match timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Query pipeline is closed")]
    PipelineClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl SearchError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
