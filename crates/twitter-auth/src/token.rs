//! OAuth 1.0a token endpoints
//!
//! Handles the two token endpoint interactions of the three-legged flow:
//! 1. Request token: obtain temporary credentials bound to our callback URL
//! 2. Access token: trade the request token + verifier for the long-lived
//!    access token
//!
//! Both are signed POSTs with an empty body. The provider answers with an
//! `application/x-www-form-urlencoded` body, not JSON.

use std::collections::HashMap;

use common::Secret;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{ACCESS_TOKEN_ENDPOINT, AUTHORIZE_ENDPOINT, REQUEST_TOKEN_ENDPOINT};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::signature::{SigningKey, authorization_header};

/// A user's long-lived authorization grant.
///
/// Persisted as `{"token": "...", "secret": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub secret: Secret<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: Secret::new(secret.into()),
        }
    }
}

/// Temporary credentials identifying one in-progress authorization.
/// Single use, never persisted.
#[derive(Debug, Clone)]
pub struct RequestToken {
    pub token: String,
    pub secret: Secret<String>,
}

impl RequestToken {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: Secret::new(secret.into()),
        }
    }
}

/// Result of the first leg: the request token and the page the user must
/// visit to approve it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub request_token: RequestToken,
    pub authorization_url: String,
}

/// Provider endpoints for the three legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            request_token_url: REQUEST_TOKEN_ENDPOINT.to_owned(),
            authorize_url: AUTHORIZE_ENDPOINT.to_owned(),
            access_token_url: ACCESS_TOKEN_ENDPOINT.to_owned(),
        }
    }
}

impl OAuthEndpoints {
    /// Page the user visits to approve `request_token`.
    pub fn authorization_url(&self, request_token: &str) -> String {
        let separator = if self.authorize_url.contains('?') { '&' } else { '?' };
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("oauth_token", request_token)
            .finish();
        format!("{}{separator}{query}", self.authorize_url)
    }
}

/// Obtain a request token bound to `callback_url` (first leg).
pub async fn request_token(
    client: &reqwest::Client,
    endpoints: &OAuthEndpoints,
    credentials: &Credentials,
    callback_url: &str,
) -> Result<AuthorizationRequest> {
    let key = SigningKey::consumer(credentials);
    let header = authorization_header(
        "POST",
        &endpoints.request_token_url,
        &key,
        &[("oauth_callback", callback_url)],
        &[],
    )?;

    let body = post_signed(client, &endpoints.request_token_url, header)
        .await
        .map_err(|e| match e {
            Error::TokenExchange(msg) => Error::RequestToken(msg),
            other => other,
        })?;
    let mut fields = parse_form(&body);

    if fields.get("oauth_callback_confirmed").map(String::as_str) != Some("true") {
        return Err(Error::RequestToken(
            "provider did not confirm the callback URL".into(),
        ));
    }

    let (token, secret) = take_token_pair(&mut fields)
        .ok_or_else(|| Error::RequestToken(format!("invalid request token response: {body}")))?;

    debug!(request_token = %token, "obtained request token");
    let authorization_url = endpoints.authorization_url(&token);
    Ok(AuthorizationRequest {
        request_token: RequestToken::new(token, secret),
        authorization_url,
    })
}

/// Exchange an authorized request token for an access token (third leg).
///
/// The request token and its secret sign the call; the verifier proves the
/// user approved it in the browser.
pub async fn exchange_verifier(
    client: &reqwest::Client,
    endpoints: &OAuthEndpoints,
    credentials: &Credentials,
    request_token: &RequestToken,
    verifier: &str,
) -> Result<AccessToken> {
    let key = SigningKey::consumer(credentials)
        .with_token(&request_token.token, request_token.secret.expose());
    let header = authorization_header(
        "POST",
        &endpoints.access_token_url,
        &key,
        &[("oauth_verifier", verifier)],
        &[],
    )?;

    let body = post_signed(client, &endpoints.access_token_url, header).await?;
    let mut fields = parse_form(&body);

    let (token, secret) = take_token_pair(&mut fields)
        .ok_or_else(|| Error::TokenExchange("access token response missing oauth_token".into()))?;

    if let Some(screen_name) = fields.get("screen_name") {
        debug!(%screen_name, "access token issued");
    }
    Ok(AccessToken::new(token, secret))
}

async fn post_signed(client: &reqwest::Client, url: &str, header: String) -> Result<String> {
    let response = client
        .post(url)
        .header(AUTHORIZATION, header)
        .send()
        .await
        .map_err(|e| Error::Http(format!("{url}: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));

    if !status.is_success() {
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }
    Ok(body)
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

fn take_token_pair(fields: &mut HashMap<String, String>) -> Option<(String, String)> {
    let token = fields.remove("oauth_token").filter(|t| !t.is_empty())?;
    let secret = fields.remove("oauth_token_secret")?;
    Some((token, secret))
}
