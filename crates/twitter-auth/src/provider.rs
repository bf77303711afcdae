//! Provider seam for the authorization flow
//!
//! The flow and the callback handler talk to the provider only through
//! `OAuthProvider`, so tests can drive the whole handshake against a
//! scripted provider. `TwitterOAuth` is the real implementation on top of
//! the signed token endpoint calls in [`crate::token`].
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn OAuthProvider>`).

use std::future::Future;
use std::pin::Pin;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::token::{self, AccessToken, AuthorizationRequest, OAuthEndpoints, RequestToken};

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The two provider-side legs of the three-legged handshake.
pub trait OAuthProvider: Send + Sync {
    /// Obtain a request token bound to `callback_url` and the URL the user
    /// must visit to approve it.
    fn request_authorization<'a>(&'a self, callback_url: &'a str) -> ProviderFuture<'a, AuthorizationRequest>;

    /// Trade an approved request token and its verifier for an access token.
    fn exchange<'a>(
        &'a self,
        request_token: &'a RequestToken,
        verifier: &'a str,
    ) -> ProviderFuture<'a, AccessToken>;
}

/// Twitter's OAuth 1.0a endpoints, signed with the application credentials.
pub struct TwitterOAuth {
    client: reqwest::Client,
    endpoints: OAuthEndpoints,
    credentials: Credentials,
}

impl TwitterOAuth {
    pub fn new(client: reqwest::Client, endpoints: OAuthEndpoints, credentials: Credentials) -> Self {
        Self {
            client,
            endpoints,
            credentials,
        }
    }
}

impl OAuthProvider for TwitterOAuth {
    fn request_authorization<'a>(&'a self, callback_url: &'a str) -> ProviderFuture<'a, AuthorizationRequest> {
        Box::pin(token::request_token(
            &self.client,
            &self.endpoints,
            &self.credentials,
            callback_url,
        ))
    }

    fn exchange<'a>(
        &'a self,
        request_token: &'a RequestToken,
        verifier: &'a str,
    ) -> ProviderFuture<'a, AccessToken> {
        Box::pin(token::exchange_verifier(
            &self.client,
            &self.endpoints,
            &self.credentials,
            request_token,
            verifier,
        ))
    }
}
