//! OAuth1-signed HTTP client for the provider's REST API
//!
//! Every call to `api_base` carries an `Authorization: OAuth ...` header
//! signed with the application credentials and the user's access token.
//! Form bodies are part of the signature. Image downloads from the public
//! CDN are sent unsigned.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;
use twitter_auth::signature::{SigningKey, authorization_header, percent_encode};
use twitter_auth::{AccessToken, Credentials};

use crate::error::{Error, Result};

/// Twitter REST API v1.1 root.
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";

/// Client acting on behalf of one authorized user.
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    credentials: Credentials,
    token: AccessToken,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        credentials: Credentials,
        token: AccessToken,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            credentials,
            token,
        }
    }

    /// Absolute URL for an API path such as `/account/verify_credentials.json`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn signing_key(&self) -> SigningKey<'_> {
        SigningKey::consumer(&self.credentials)
            .with_token(&self.token.token, self.token.secret.expose())
    }

    /// Signed GET decoding a JSON body. Non-success statuses are errors.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let header = authorization_header("GET", &url, &self.signing_key(), &[], &[])?;

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;
        debug!(%url, status = status.as_u16(), "signed GET");

        if !status.is_success() {
            return Err(Error::Status(format!("GET {url} returned {status}: {body}")));
        }
        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{url}: {e}")))
    }

    /// Signed POST with an `application/x-www-form-urlencoded` body.
    ///
    /// Returns the raw response; the caller decides what a failure status
    /// means for its operation.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        let header = authorization_header("POST", &url, &self.signing_key(), &[], fields)?;
        let body = encode_form(fields);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, header)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;

        debug!(%url, status = response.status().as_u16(), "signed POST");
        Ok(response)
    }

    /// Unsigned GET returning the body bytes. Non-success statuses are errors.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(format!("GET {url} returned {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;
        debug!(%url, len = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }
}

/// Form body using the same RFC 3986 encoding as the signature, so the
/// provider decodes exactly the values that were signed.
fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
