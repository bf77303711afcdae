//! Twitter OAuth 1.0a authentication library
//!
//! Provides the three-legged authorization flow, OAuth1 request signing,
//! and credential/token storage. This crate is a standalone library with no
//! dependency on the binary, so it can be tested and used independently.
//!
//! Credential flow:
//! 1. `CredentialResolver::resolve()` finds the application key/secret
//! 2. `TokenStore::load()` finds the user's access token, or reports
//!    `Error::NotAuthenticated`
//! 3. If not authenticated, `AuthorizationFlow::run()` obtains a request
//!    token, sends the user to the authorization page, receives the
//!    verifier on a temporary local listener and exchanges it
//! 4. The access token is saved via `TokenStore::save()`
//! 5. API calls are signed with `signature::authorization_header()`

pub mod browser;
pub mod callback;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod provider;
pub mod signature;
pub mod store;
pub mod token;

pub use browser::{SystemLauncher, UrlLauncher};
pub use constants::*;
pub use credentials::{CredentialResolver, Credentials};
pub use error::{Error, Result};
pub use flow::{AuthorizationFlow, FlowConfig};
pub use provider::{OAuthProvider, TwitterOAuth};
pub use signature::{SigningKey, authorization_header};
pub use store::TokenStore;
pub use token::{AccessToken, AuthorizationRequest, OAuthEndpoints, RequestToken};
