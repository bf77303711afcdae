//! Error types for OAuth authentication operations

/// Errors from OAuth authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request token failed: {0}")]
    RequestToken(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("signing failed: {0}")]
    Signature(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// No token in the environment and no token file. Not a failure: the
    /// caller should run the authorization flow.
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("authorization was denied in the browser")]
    AuthorizationDenied,

    #[error("callback listener error: {0}")]
    Callback(String),
}

impl Error {
    /// Whether this is the "please authenticate first" control signal.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Error::NotAuthenticated(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
