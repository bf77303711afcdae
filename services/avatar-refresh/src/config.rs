//! Configuration types and loading
//!
//! Every setting has a built-in default, so the config file is optional.
//! File lookup: `CONFIG_PATH` env var, else `twitter-avatar-refresh.toml` in
//! the working directory when it exists, else defaults only. A file named by
//! `CONFIG_PATH` must exist.
//!
//! Secrets never live here: the files and env var names below only say
//! where the credentials and token are kept.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use twitter_auth::{FlowConfig, OAuthEndpoints};

pub const DEFAULT_CONFIG_FILE: &str = "twitter-avatar-refresh.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: FilesConfig,
    pub env: EnvConfig,
    pub callback: CallbackConfig,
    pub twitter: TwitterConfig,
}

/// Credential and token file locations
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub credentials: PathBuf,
    pub token: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            credentials: PathBuf::from(twitter_auth::DEFAULT_CREDENTIALS_FILE),
            token: PathBuf::from(twitter_auth::DEFAULT_TOKEN_FILE),
        }
    }
}

/// Names of the environment variables that may carry JSON credentials/token
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub credentials: String,
    pub token: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            credentials: twitter_auth::DEFAULT_CREDENTIALS_ENV.to_owned(),
            token: twitter_auth::DEFAULT_TOKEN_ENV.to_owned(),
        }
    }
}

/// Temporary callback listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    pub listen_addr: SocketAddr,
    /// Host used in the callback URL sent to the provider
    pub host: String,
    pub path: String,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        let flow = FlowConfig::default();
        Self {
            listen_addr: flow.listen_addr,
            host: flow.callback_host,
            path: flow.callback_path,
        }
    }
}

/// Provider endpoints
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub api_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        let endpoints = OAuthEndpoints::default();
        Self {
            request_token_url: endpoints.request_token_url,
            authorize_url: endpoints.authorize_url,
            access_token_url: endpoints.access_token_url,
            api_base: twitter_api::DEFAULT_API_BASE.to_owned(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| common::Error::io(path, e))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the resolved file, or fall back to defaults when there is none.
    pub fn load_or_default(path: Option<&Path>) -> common::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Config file to read, if any.
    pub fn resolve_path() -> Option<PathBuf> {
        if let Some(p) = std::env::var("CONFIG_PATH").ok().filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    }

    fn validate(&self) -> common::Result<()> {
        let urls = [
            ("request_token_url", &self.twitter.request_token_url),
            ("authorize_url", &self.twitter.authorize_url),
            ("access_token_url", &self.twitter.access_token_url),
            ("api_base", &self.twitter.api_base),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if !self.callback.path.starts_with('/') {
            return Err(common::Error::Config(format!(
                "callback path must start with '/', got: {}",
                self.callback.path
            )));
        }

        if self.callback.host.is_empty() {
            return Err(common::Error::Config("callback host must not be empty".into()));
        }

        Ok(())
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            listen_addr: self.callback.listen_addr,
            callback_host: self.callback.host.clone(),
            callback_path: self.callback.path.clone(),
        }
    }

    pub fn endpoints(&self) -> OAuthEndpoints {
        OAuthEndpoints {
            request_token_url: self.twitter.request_token_url.clone(),
            authorize_url: self.twitter.authorize_url.clone(),
            access_token_url: self.twitter.access_token_url.clone(),
        }
    }
}
