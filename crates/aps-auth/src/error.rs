//! Error types for OAuth broker operations

/// Errors from OAuth broker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The provider rejected the grant: bad, expired, or already-consumed
    /// authorization code, or an invalid/revoked refresh token. Surfaced to
    /// the browser as 401, never retried.
    #[error("auth exchange failed: {0}")]
    AuthExchange(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Result alias for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_detail() {
        let err = Error::AuthExchange("code already consumed".into());
        assert!(err.to_string().contains("code already consumed"));
        assert!(
            Error::Http("connection refused".into())
                .to_string()
                .contains("connection refused")
        );
    }
}
