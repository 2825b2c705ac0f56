//! Error taxonomy for tool calls.
//!
//! Every variant ends up as user-facing text at the tool boundary; nothing
//! here is allowed to escape as a protocol-level fault.

use thiserror::Error;

/// Failure talking to the upstream data API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Request(err)
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Malformed(err.to_string())
    }
}

/// Everything a single tool invocation can fail with.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidInput(String),

    /// The upstream call succeeded but returned no records.
    #[error("{0}")]
    NotFound(&'static str),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidInput(_) => "invalid_input",
            ToolError::NotFound(_) => "not_found",
            ToolError::Upstream(_) => "upstream_failure",
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ToolError::Upstream(UpstreamError::Malformed(message.into()))
    }
}
