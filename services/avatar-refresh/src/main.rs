//! Twitter avatar refresh
//!
//! Single-binary CLI that:
//! 1. Resolves the application credentials (file, env, or prompt)
//! 2. Loads the user's access token, running the browser-based OAuth1
//!    handshake first when there is none
//! 3. Downloads the current profile image at full size
//! 4. Uploads it again as the new profile image

mod config;
mod error;

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitter_api::{ApiClient, refresh_profile_image};
use twitter_auth::{AccessToken, AuthorizationFlow, CredentialResolver, Credentials, SystemLauncher, TokenStore, TwitterOAuth};

use crate::config::Config;

const SUCCESS_MESSAGE: &str = "Profile image updated successfully!";

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for prompts and the result line
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = std::env::args_os().skip(1).collect();
    match run(args, Config::resolve_path(), &mut std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// The whole program. `out` receives the success line only once the upload
/// has been accepted.
async fn run(args: Vec<OsString>, config_path: Option<PathBuf>, out: &mut impl Write) -> Result<()> {
    check_args(&args)?;

    let config = Config::load_or_default(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "invalid default configuration".to_owned(),
    })?;
    info!(
        config = ?config_path,
        credentials_file = %config.files.credentials.display(),
        token_file = %config.files.token.display(),
        "configuration loaded"
    );

    let resolver = CredentialResolver::new(config.files.credentials.clone(), config.env.credentials.clone());
    let credentials = tokio::task::spawn_blocking(move || resolver.resolve())
        .await
        .context("credential prompt failed")?;

    let http = reqwest::Client::new();
    let store = Arc::new(TokenStore::new(config.files.token.clone(), config.env.token.clone()));
    let token = load_or_authorize(&config, &http, &credentials, store).await?;

    let client = ApiClient::new(http, config.twitter.api_base.clone(), credentials, token);
    refresh_profile_image(&client).await?;

    writeln!(out, "{SUCCESS_MESSAGE}")?;
    Ok(())
}

/// Any argument is a usage error. Non-UTF-8 arguments are reported lossily.
fn check_args(args: &[OsString]) -> error::Result<()> {
    if args.is_empty() {
        return Ok(());
    }
    let shown: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    Err(error::Error::Usage(shown.join(" ")))
}

/// Stored access token, or a fresh one from the browser handshake when none
/// is stored yet.
async fn load_or_authorize(
    config: &Config,
    http: &reqwest::Client,
    credentials: &Credentials,
    store: Arc<TokenStore>,
) -> Result<AccessToken> {
    match store.load().await {
        Ok(token) => return Ok(token),
        Err(e) if e.is_not_authenticated() => {
            info!(reason = %e, "no access token, starting authorization");
        }
        Err(e) => return Err(e).context("failed to load access token"),
    }

    let provider = Arc::new(TwitterOAuth::new(http.clone(), config.endpoints(), credentials.clone()));
    AuthorizationFlow::new(config.flow_config(), provider, store.clone(), Arc::new(SystemLauncher::new()))
        .run()
        .await
        .context("authorization failed")?;

    store
        .load()
        .await
        .context("failed to load access token after authorization")
}
