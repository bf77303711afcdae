//! Temporary OAuth callback listener
//!
//! Serves exactly one route. The provider redirects the browser there with
//! `oauth_token` and `oauth_verifier` once the user approves the app.
//!
//! The pending exchange (request token + completion sender) lives in a
//! take-once slot owned by the router state. The first callback carrying a
//! verifier takes it, performs the exchange, persists the token and
//! signals the waiting flow. Every later request finds the slot empty and
//! gets `410 Gone`, so the completion signal fires at most once.
//!
//! Responses:
//! - 200 plain text on success
//! - 400 when `oauth_verifier` is missing (slot untouched)
//! - 403 when the user denied access (`denied` parameter)
//! - 410 once the exchange has already been attempted
//! - 500 with the error text when the exchange or save fails

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::sync::{Mutex, oneshot};
use tracing::{info, warn};

use crate::constants::CALLBACK_SUCCESS_MESSAGE;
use crate::error::{Error, Result};
use crate::provider::OAuthProvider;
use crate::store::TokenStore;
use crate::token::RequestToken;

/// Outcome delivered to the flow waiting on the callback.
pub type CallbackOutcome = Result<()>;

/// The single in-flight exchange. Consumed by the first valid callback.
pub struct PendingExchange {
    pub request_token: RequestToken,
    pub done: oneshot::Sender<CallbackOutcome>,
}

/// Shared state for the callback handler.
#[derive(Clone)]
pub struct CallbackState {
    provider: Arc<dyn OAuthProvider>,
    store: Arc<TokenStore>,
    pending: Arc<Mutex<Option<PendingExchange>>>,
}

impl CallbackState {
    pub fn new(provider: Arc<dyn OAuthProvider>, store: Arc<TokenStore>, pending: PendingExchange) -> Self {
        Self {
            provider,
            store,
            pending: Arc::new(Mutex::new(Some(pending))),
        }
    }
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub oauth_token: Option<String>,
    #[serde(default)]
    pub oauth_verifier: Option<String>,
    #[serde(default)]
    pub denied: Option<String>,
}

/// Build the callback router serving only `path`.
pub fn build_callback_router(state: CallbackState, path: &str) -> Router {
    Router::new()
        .route(path, get(callback_handler))
        .with_state(state)
}

async fn callback_handler(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let verifier = params.oauth_verifier.filter(|v| !v.is_empty());
    if verifier.is_none() && params.denied.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            "missing oauth_verifier query parameter",
        )
            .into_response();
    }

    let Some(pending) = state.pending.lock().await.take() else {
        return (StatusCode::GONE, "authorization already completed").into_response();
    };

    if params.denied.is_some() {
        warn!("user denied authorization");
        let _ = pending.done.send(Err(Error::AuthorizationDenied));
        return (
            StatusCode::FORBIDDEN,
            "Authorization was denied. You can close this window.",
        )
            .into_response();
    }

    if params
        .oauth_token
        .as_deref()
        .is_some_and(|token| token != pending.request_token.token)
    {
        warn!("callback token does not match the pending request token");
    }

    let verifier = verifier.unwrap_or_default();
    match complete_exchange(&state, &pending.request_token, &verifier).await {
        Ok(()) => {
            info!("authorization complete, access token saved");
            let _ = pending.done.send(Ok(()));
            (StatusCode::OK, CALLBACK_SUCCESS_MESSAGE).into_response()
        }
        Err(e) => {
            warn!(error = %e, "token exchange failed");
            let body = e.to_string();
            let _ = pending.done.send(Err(e));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

async fn complete_exchange(state: &CallbackState, request_token: &RequestToken, verifier: &str) -> Result<()> {
    let token = state.provider.exchange(request_token, verifier).await?;
    state.store.save(&token).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::provider::ProviderFuture;
    use crate::token::{AccessToken, AuthorizationRequest};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex as StdMutex;
    use tower::ServiceExt;

    /// Scripted provider recording every exchange it is asked to perform.
    pub(crate) struct ScriptedProvider {
        pub authorization: Option<AuthorizationRequest>,
        pub access_token: Option<AccessToken>,
        pub exchanges: StdMutex<Vec<(String, String, String)>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(access_token: Option<AccessToken>) -> Self {
            Self {
                authorization: Some(AuthorizationRequest {
                    request_token: RequestToken::new("req123", "secret1"),
                    authorization_url: "https://provider.test/oauth/authorize?oauth_token=req123".into(),
                }),
                access_token,
                exchanges: StdMutex::new(Vec::new()),
            }
        }

        pub(crate) fn exchange_calls(&self) -> Vec<(String, String, String)> {
            self.exchanges.lock().unwrap().clone()
        }
    }

    impl OAuthProvider for ScriptedProvider {
        fn request_authorization<'a>(&'a self, _callback_url: &'a str) -> ProviderFuture<'a, AuthorizationRequest> {
            let result = self
                .authorization
                .clone()
                .ok_or_else(|| Error::RequestToken("token endpoint returned 401 Unauthorized".into()));
            Box::pin(async move { result })
        }

        fn exchange<'a>(
            &'a self,
            request_token: &'a RequestToken,
            verifier: &'a str,
        ) -> ProviderFuture<'a, AccessToken> {
            self.exchanges.lock().unwrap().push((
                request_token.token.clone(),
                request_token.secret.expose().clone(),
                verifier.to_owned(),
            ));
            let result = self
                .access_token
                .clone()
                .ok_or_else(|| Error::TokenExchange("token endpoint returned 401 Unauthorized: Invalid request token.".into()));
            Box::pin(async move { result })
        }
    }

    fn router_with(
        provider: Arc<ScriptedProvider>,
        store: Arc<TokenStore>,
    ) -> (Router, oneshot::Receiver<CallbackOutcome>) {
        let (done, rx) = oneshot::channel();
        let state = CallbackState::new(
            provider,
            store,
            PendingExchange {
                request_token: RequestToken::new("req123", "secret1"),
                done,
            },
        );
        (build_callback_router(state, "/callback"), rx)
    }

    async fn send_get(router: &Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    fn temp_store(dir: &tempfile::TempDir) -> Arc<TokenStore> {
        Arc::new(TokenStore::new(dir.path().join("twitter_token.json"), "AVATAR_TEST_CALLBACK_TOKEN_UNSET"))
    }

    #[tokio::test]
    async fn exchange_uses_request_token_and_verifier() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(Some(AccessToken::new("T1", "S1"))));
        let (router, done) = router_with(provider.clone(), temp_store(&dir));

        let (status, body) = send_get(&router, "/callback?oauth_token=req123&oauth_verifier=verify987").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, CALLBACK_SUCCESS_MESSAGE);
        assert_eq!(
            provider.exchange_calls(),
            vec![("req123".to_string(), "secret1".to_string(), "verify987".to_string())]
        );
        assert!(done.await.unwrap().is_ok());

        let saved = std::fs::read_to_string(dir.path().join("twitter_token.json")).unwrap();
        assert_eq!(saved, r#"{"token":"T1","secret":"S1"}"#);
    }

    #[tokio::test]
    async fn second_callback_is_gone_and_not_exchanged() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(Some(AccessToken::new("T1", "S1"))));
        let (router, _done) = router_with(provider.clone(), temp_store(&dir));

        let (first, _) = send_get(&router, "/callback?oauth_verifier=verify987").await;
        let (second, _) = send_get(&router, "/callback?oauth_verifier=verify987").await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::GONE);
        assert_eq!(provider.exchange_calls().len(), 1, "exchange must run exactly once");
    }

    #[tokio::test]
    async fn failed_exchange_reports_500_and_signals_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(None));
        let (router, done) = router_with(provider, temp_store(&dir));

        let (status, body) = send_get(&router, "/callback?oauth_verifier=verify987").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Invalid request token."), "got: {body}");
        assert!(matches!(done.await.unwrap(), Err(Error::TokenExchange(_))));
        assert!(!dir.path().join("twitter_token.json").exists(), "failed exchange must not write a token");
    }

    #[tokio::test]
    async fn missing_verifier_is_rejected_without_consuming() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(Some(AccessToken::new("T1", "S1"))));
        let (router, _done) = router_with(provider.clone(), temp_store(&dir));

        let (status, _) = send_get(&router, "/callback?oauth_token=req123").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(provider.exchange_calls().is_empty());

        let (status, _) = send_get(&router, "/callback?oauth_verifier=verify987").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn denied_authorization_signals_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(Some(AccessToken::new("T1", "S1"))));
        let (router, done) = router_with(provider.clone(), temp_store(&dir));

        let (status, _) = send_get(&router, "/callback?denied=req123").await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(matches!(done.await.unwrap(), Err(Error::AuthorizationDenied)));
        assert!(provider.exchange_calls().is_empty());
    }

    #[tokio::test]
    async fn other_paths_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(Some(AccessToken::new("T1", "S1"))));
        let (router, _done) = router_with(provider.clone(), temp_store(&dir));

        let (status, _) = send_get(&router, "/favicon.ico").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(provider.exchange_calls().is_empty());
    }
}
