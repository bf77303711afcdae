//! Twitter OAuth 1.0a constants
//!
//! Endpoint URLs and the on-disk/environment names used when nothing else is
//! configured. Everything here is a default: callers pass the effective
//! values to constructors so tests can point at local mock servers.

/// Temporary credential (request token) endpoint
pub const REQUEST_TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth/request_token";

/// Resource owner authorization page the user visits in a browser
pub const AUTHORIZE_ENDPOINT: &str = "https://api.twitter.com/oauth/authorize";

/// Token endpoint that trades a request token + verifier for an access token
pub const ACCESS_TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth/access_token";

/// Address the temporary callback listener binds to
pub const DEFAULT_CALLBACK_LISTEN_ADDR: &str = "127.0.0.1:4673";

/// Host name placed in the callback URL registered with the provider
pub const DEFAULT_CALLBACK_HOST: &str = "localhost";

/// Single route served by the callback listener
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// File holding the application's API key and secret
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// File holding the user's long-lived access token
pub const DEFAULT_TOKEN_FILE: &str = "twitter_token.json";

/// Environment variable carrying JSON-encoded credentials
pub const DEFAULT_CREDENTIALS_ENV: &str = "CREDENTIALS";

/// Environment variable carrying a JSON-encoded access token
pub const DEFAULT_TOKEN_ENV: &str = "TOKEN";

/// Body returned to the browser once the access token is stored
pub const CALLBACK_SUCCESS_MESSAGE: &str = "Authentication successful! You can close this window.";
