//! Access token storage
//!
//! The token comes from, in order:
//! 1. the token environment variable (JSON), when set and non-empty
//! 2. the token file (JSON)
//!
//! A missing file with no environment token is `Error::NotAuthenticated`,
//! the signal to run the authorization flow. Malformed JSON from either
//! source is a `CredentialParse` error, which callers treat as fatal.
//!
//! Writes use atomic temp-file + rename with 0600 permissions.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::token::AccessToken;

/// Loads and saves the long-lived access token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    env_var: String,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>, env_var: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            env_var: env_var.into(),
        }
    }

    /// Token file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the access token, preferring the environment over the file.
    pub async fn load(&self) -> Result<AccessToken> {
        if let Some(raw) = std::env::var(&self.env_var).ok().filter(|v| !v.is_empty()) {
            debug!(env = %self.env_var, "using access token from environment");
            return serde_json::from_str(&raw).map_err(|e| {
                Error::CredentialParse(format!("parsing {} environment variable: {e}", self.env_var))
            });
        }

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotAuthenticated(format!(
                    "no access token at {}",
                    self.path.display()
                )));
            }
            Err(e) => {
                return Err(Error::Io(format!(
                    "reading token file {}: {e}",
                    self.path.display()
                )));
            }
        };

        debug!(path = %self.path.display(), "using access token from file");
        serde_json::from_str(&contents).map_err(|e| {
            Error::CredentialParse(format!("parsing token file {}: {e}", self.path.display()))
        })
    }

    /// Persist the access token, replacing any previous one.
    pub async fn save(&self, token: &AccessToken) -> Result<()> {
        let json = serde_json::to_string(token)
            .map_err(|e| Error::CredentialParse(format!("serializing token: {e}")))?;
        write_atomic(&self.path, json.as_bytes()).await
    }
}

/// Write a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so readers never see a partial token. The temp file is
/// created 0600 (owner read/write only) and removed again if any step fails.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io(format!("token path {} has no file name", path.display())))?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    let result = write_then_rename(&tmp_path, path, data).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result
}

async fn write_then_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(tmp_path)
        .await
        .map_err(|e| Error::Io(format!("creating temp token file: {e}")))?;
    file.write_all(data)
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;
    file.sync_all()
        .await
        .map_err(|e| Error::Io(format!("flushing temp token file: {e}")))?;
    drop(file);

    tokio::fs::rename(tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted access token");
    Ok(())
}
