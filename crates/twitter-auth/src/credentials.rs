//! Application credentials (API key + secret)
//!
//! Resolution order, first hit wins:
//! 1. the credentials file (JSON)
//! 2. the credentials environment variable (JSON)
//! 3. an interactive prompt on stdin, written back to the credentials file
//!
//! Resolution never fails. Unreadable or malformed sources are skipped and,
//! when everything is exhausted, the user is asked. Writing the prompted
//! values back is best effort.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Identifies the application to the provider (OAuth consumer key/secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: Secret<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: Secret::new(api_secret.into()),
        }
    }
}

/// Where credentials may come from, in precedence order.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    path: PathBuf,
    env_var: String,
}

impl CredentialResolver {
    pub fn new(path: impl Into<PathBuf>, env_var: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            env_var: env_var.into(),
        }
    }

    /// Resolve credentials, prompting on the process stdin/stdout if needed.
    ///
    /// Blocks on terminal input when neither the file nor the environment
    /// provides credentials.
    pub fn resolve(&self) -> Credentials {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        self.resolve_with(&mut stdin.lock(), &mut stdout)
    }

    /// Resolve credentials using the given prompt input/output.
    pub fn resolve_with<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Credentials {
        if let Some(credentials) = self.from_file() {
            debug!(path = %self.path.display(), "credentials loaded from file");
            return credentials;
        }

        if let Some(credentials) = self.from_env() {
            debug!(env = %self.env_var, "credentials loaded from environment");
            return credentials;
        }

        let api_key = prompt(input, output, "Enter API Key: ");
        let api_secret = prompt(input, output, "Enter API Secret: ");
        let credentials = Credentials::new(api_key, api_secret);

        match persist(&self.path, &credentials) {
            Ok(()) => info!(path = %self.path.display(), "saved credentials"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "could not save credentials, continuing with entered values"
            ),
        }

        credentials
    }

    fn from_file(&self) -> Option<Credentials> {
        let data = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice(&data) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring unparsable credentials file");
                None
            }
        }
    }

    fn from_env(&self) -> Option<Credentials> {
        let raw = std::env::var(&self.env_var).ok().filter(|v| !v.is_empty())?;
        match serde_json::from_str(&raw) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                debug!(env = %self.env_var, error = %e, "ignoring unparsable credentials variable");
                None
            }
        }
    }
}

/// Ask for one value. I/O failures and EOF yield an empty string; bad
/// values are rejected later by the provider.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> String {
    let _ = write!(output, "{label}");
    let _ = output.flush();

    let mut line = String::new();
    if let Err(e) = input.read_line(&mut line) {
        debug!(error = %e, "failed to read prompt input");
    }
    line.trim().to_owned()
}

/// Write credentials as JSON, creating the file owner read/write only.
fn persist(path: &Path, credentials: &Credentials) -> io::Result<()> {
    let json = serde_json::to_vec(credentials)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)?.write_all(&json)
}
