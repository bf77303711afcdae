//! Secret wrapper for sensitive values
//!
//! API secrets and OAuth token secrets travel through this type. It is
//! redacted in Debug/Display (and therefore in tracing fields) and zeroized
//! on drop. Serde support is transparent: the wrapped value is written as-is
//! because the credential and token files must hold the real secret.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Zeroize + Serialize> Serialize for Secret<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Secret::new)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacts_debug() {
        let secret = Secret::new(String::from("consumer-secret"));
        let debug = format!("{:?}", secret);
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("consumer-secret"));
        assert_eq!(secret.to_string(), "[REDACTED]");
    }

    #[test]
    fn test_secret_exposes_value() {
        let secret = Secret::from("consumer-secret");
        assert_eq!(secret.expose(), "consumer-secret");
    }

    #[test]
    fn test_secret_serializes_transparently() {
        #[derive(Serialize, Deserialize)]
        struct Pair {
            token: String,
            secret: Secret<String>,
        }

        let json = r#"{"token":"T1","secret":"S1"}"#;
        let pair: Pair = serde_json::from_str(json).unwrap();
        assert_eq!(pair.secret.expose(), "S1");
        assert_eq!(serde_json::to_string(&pair).unwrap(), json);
    }
}
