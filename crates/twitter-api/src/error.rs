//! Error types for authenticated API calls

/// Errors from calls against the provider's REST API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success status on a read call.
    #[error("{0}")]
    Status(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Signature(#[from] twitter_auth::Error),

    #[error("Update failed: {0}")]
    UpdateFailed(String),
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_failure_names_the_status() {
        let err = Error::UpdateFailed("403 Forbidden".into());
        assert_eq!(err.to_string(), "Update failed: 403 Forbidden");
    }

    #[test]
    fn signing_errors_pass_through_unchanged() {
        let err: Error = twitter_auth::Error::Signature("invalid HMAC key".into()).into();
        assert_eq!(err.to_string(), "signing failed: invalid HMAC key");
    }
}
