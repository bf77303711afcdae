//! Service-specific error types

use thiserror::Error;

/// Errors raised by the binary itself, before any library code runs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("usage: twitter-avatar-refresh (takes no arguments, got: {0})")]
    Usage(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_names_the_arguments() {
        let err = Error::Usage("--help".into());
        assert_eq!(
            err.to_string(),
            "usage: twitter-avatar-refresh (takes no arguments, got: --help)"
        );
    }
}
