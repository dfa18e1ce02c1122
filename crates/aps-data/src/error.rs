//! Error types for upstream read calls

/// Errors from Data Management / user-profile calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider answered with a non-2xx status. Status and body are
    /// carried unmodified so the service can pass them through to the
    /// browser without translation.
    #[error("upstream returned {status}")]
    Upstream { status: u16, body: String },

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Result alias for upstream read calls.
pub type Result<T> = std::result::Result<T, Error>;
