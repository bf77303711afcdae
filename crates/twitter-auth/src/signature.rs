//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1)
//!
//! Every call to the provider carries an `Authorization: OAuth ...` header
//! whose `oauth_signature` is an HMAC-SHA1 over the signature base string:
//!
//! ```text
//! METHOD & enc(base_url) & enc(sorted "enc(k)=enc(v)" pairs joined by "&")
//! ```
//!
//! The pairs include the protocol parameters and any form-body parameters.
//! The HMAC key is `enc(consumer_secret) & enc(token_secret)`, where the
//! token secret is empty while no token exists yet.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngExt;
use sha1::Sha1;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// RFC 3986 unreserved characters stay literal, everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Keys used to sign one request: the application's consumer pair and,
/// once the handshake has produced one, a token pair.
#[derive(Clone, Copy)]
pub struct SigningKey<'a> {
    consumer_key: &'a str,
    consumer_secret: &'a str,
    token: Option<&'a str>,
    token_secret: &'a str,
}

impl<'a> SigningKey<'a> {
    /// Consumer-only key, used for the request-token call.
    pub fn consumer(credentials: &'a Credentials) -> Self {
        Self {
            consumer_key: &credentials.api_key,
            consumer_secret: credentials.api_secret.expose(),
            token: None,
            token_secret: "",
        }
    }

    /// Add a token pair (request token during exchange, access token after).
    pub fn with_token(mut self, token: &'a str, token_secret: &'a str) -> Self {
        self.token = Some(token);
        self.token_secret = token_secret;
        self
    }
}

/// Percent-encode a value the way OAuth 1.0a requires.
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Build the signature base string for a request.
///
/// `url` must be the base URL without query string; query and form
/// parameters belong in `params`.
pub fn signature_base_string<'p>(
    method: &str,
    url: &str,
    params: impl IntoIterator<Item = (&'p str, &'p str)>,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&normalized)
    )
}

/// HMAC-SHA1 the base string with the request's signing key, base64 encoded.
pub fn sign(base_string: &str, key: &SigningKey<'_>) -> Result<String> {
    let hmac_key = format!(
        "{}&{}",
        percent_encode(key.consumer_secret),
        percent_encode(key.token_secret)
    );
    let mut mac = Hmac::<Sha1>::new_from_slice(hmac_key.as_bytes())
        .map_err(|e| Error::Signature(format!("invalid HMAC key: {e}")))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the `Authorization` header value for a request, using a fresh nonce
/// and the current time.
///
/// `protocol_extra` carries step-specific `oauth_*` parameters such as
/// `oauth_callback` or `oauth_verifier`. `body` carries form parameters that
/// are sent in an `application/x-www-form-urlencoded` body.
pub fn authorization_header(
    method: &str,
    url: &str,
    key: &SigningKey<'_>,
    protocol_extra: &[(&str, &str)],
    body: &[(&str, &str)],
) -> Result<String> {
    authorization_header_with(
        method,
        url,
        key,
        protocol_extra,
        body,
        &generate_nonce(),
        unix_timestamp(),
    )
}

/// Deterministic variant of [`authorization_header`].
pub fn authorization_header_with(
    method: &str,
    url: &str,
    key: &SigningKey<'_>,
    protocol_extra: &[(&str, &str)],
    body: &[(&str, &str)],
    nonce: &str,
    timestamp: u64,
) -> Result<String> {
    let timestamp = timestamp.to_string();
    let mut protocol: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", key.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_version", "1.0"),
    ];
    if let Some(token) = key.token {
        protocol.push(("oauth_token", token));
    }
    protocol.extend_from_slice(protocol_extra);

    let base = signature_base_string(method, url, protocol.iter().chain(body).copied());
    let signature = sign(&base, key)?;

    let mut fields: Vec<String> = protocol
        .iter()
        .copied()
        .chain(std::iter::once(("oauth_signature", signature.as_str())))
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect();
    fields.sort();

    Ok(format!("OAuth {}", fields.join(", ")))
}

/// Random alphanumeric nonce, unique per request.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD
        .encode(bytes)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from Twitter's "Creating a signature" guide.
    const CONSUMER_KEY: &str = "xvz1evFS4wEEPTGEFPHBog";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN: &str = "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb";
    const TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: u64 = 1318622958;
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";

    fn reference_credentials() -> Credentials {
        Credentials::new(CONSUMER_KEY, CONSUMER_SECRET)
    }

    #[test]
    fn percent_encode_keeps_unreserved_only() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("http://localhost:4673/callback"), "http%3A%2F%2Flocalhost%3A4673%2Fcallback");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn base_string_matches_reference() {
        let timestamp = TIMESTAMP.to_string();
        let params = [
            ("status", STATUS),
            ("include_entities", "true"),
            ("oauth_consumer_key", CONSUMER_KEY),
            ("oauth_nonce", NONCE),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", TOKEN),
            ("oauth_version", "1.0"),
        ];
        let base = signature_base_string("post", URL, params);
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&\
             include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26\
             oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26\
             oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26\
             oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520\
             Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn header_signature_matches_reference() {
        let credentials = reference_credentials();
        let key = SigningKey::consumer(&credentials).with_token(TOKEN, TOKEN_SECRET);
        let header = authorization_header_with(
            "POST",
            URL,
            &key,
            &[],
            &[("include_entities", "true"), ("status", STATUS)],
            NONCE,
            TIMESTAMP,
        )
        .unwrap();

        assert!(header.starts_with("OAuth "), "got: {header}");
        assert!(
            header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""),
            "got: {header}"
        );
        assert!(header.contains(&format!("oauth_token=\"{TOKEN}\"")));
        assert!(header.contains("oauth_version=\"1.0\""));
        // Body parameters are signed but never placed in the header.
        assert!(!header.contains("status="));
    }

    #[test]
    fn consumer_only_key_omits_token() {
        let credentials = reference_credentials();
        let key = SigningKey::consumer(&credentials);
        let header = authorization_header(
            "POST",
            "https://api.twitter.com/oauth/request_token",
            &key,
            &[("oauth_callback", "http://localhost:4673/callback")],
            &[],
        )
        .unwrap();

        assert!(!header.contains("oauth_token="), "got: {header}");
        assert!(
            header.contains("oauth_callback=\"http%3A%2F%2Flocalhost%3A4673%2Fcallback\""),
            "got: {header}"
        );
    }

    #[test]
    fn token_secret_changes_signature() {
        let base = "POST&x&y";
        let credentials = reference_credentials();
        let without = sign(base, &SigningKey::consumer(&credentials)).unwrap();
        let with = sign(
            base,
            &SigningKey::consumer(&credentials).with_token(TOKEN, TOKEN_SECRET),
        )
        .unwrap();
        assert_ne!(without, with);
    }

    #[test]
    fn nonces_are_alphanumeric_and_unique() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert!(a.len() >= 32, "nonce too short: {a}");
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()), "got: {a}");
        assert_ne!(a, b);
    }
}
