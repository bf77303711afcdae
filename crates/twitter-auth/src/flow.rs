//! Three-legged authorization flow
//!
//! Pure state machine plus the driver that executes its actions:
//!
//! ```text
//! Idle --RequestTokenIssued--> RequestTokenObtained --ListenerReady--> AwaitingCallback
//!                                                                          |
//!                                  Completed <--CallbackCompleted----------+
//! any state --Failed--> Failed
//! ```
//!
//! The callback listener is bound before the authorization URL is shown, so
//! a fast browser redirect cannot arrive before anything is listening. The
//! driver blocks on a oneshot completion signal sent by the callback handler
//! and always stops the listener before returning, whatever the outcome.
//!
//! There is no timeout on `AwaitingCallback`. If the user never finishes in
//! the browser, `run` never returns.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::UrlLauncher;
use crate::callback::{CallbackOutcome, CallbackState, PendingExchange, build_callback_router};
use crate::constants::{DEFAULT_CALLBACK_HOST, DEFAULT_CALLBACK_LISTEN_ADDR, DEFAULT_CALLBACK_PATH};
use crate::error::{Error, Result};
use crate::provider::OAuthProvider;
use crate::store::TokenStore;

/// Where the temporary callback listener lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Socket the listener binds to
    pub listen_addr: SocketAddr,
    /// Host name used in the callback URL given to the provider
    pub callback_host: String,
    /// Route served by the listener
    pub callback_path: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_CALLBACK_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 4673))),
            callback_host: DEFAULT_CALLBACK_HOST.to_owned(),
            callback_path: DEFAULT_CALLBACK_PATH.to_owned(),
        }
    }
}

impl FlowConfig {
    /// Callback URL registered with the provider during the first leg.
    pub fn callback_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.callback_host,
            self.listen_addr.port(),
            self.callback_path
        )
    }
}

/// Flow states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    /// Provider issued a request token; listener not yet running
    RequestTokenObtained { authorization_url: String },
    /// Listener running, user sent to the authorization page
    AwaitingCallback,
    /// Access token persisted, listener stopped
    Completed,
    Failed { error: String },
}

/// Events that drive transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    RequestTokenIssued { authorization_url: String },
    ListenerReady,
    CallbackCompleted,
    Failed(String),
}

/// Actions the driver executes after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAction {
    /// Bind the callback listener
    StartListener,
    /// Print the URL and try to open it in a browser
    PresentAuthorizationUrl { url: String },
    /// Stop the callback listener
    ShutdownListener,
    /// Give up; nothing is running
    Abort,
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: FlowState, event: FlowEvent) -> (FlowState, FlowAction) {
    match (state, event) {
        // Terminal states ignore everything
        (FlowState::Completed, _) => (FlowState::Completed, FlowAction::None),
        (state @ FlowState::Failed { .. }, _) => (state, FlowAction::None),

        (FlowState::Idle, FlowEvent::RequestTokenIssued { authorization_url }) => (
            FlowState::RequestTokenObtained { authorization_url },
            FlowAction::StartListener,
        ),

        (FlowState::RequestTokenObtained { authorization_url }, FlowEvent::ListenerReady) => (
            FlowState::AwaitingCallback,
            FlowAction::PresentAuthorizationUrl {
                url: authorization_url,
            },
        ),

        (FlowState::AwaitingCallback, FlowEvent::CallbackCompleted) => {
            (FlowState::Completed, FlowAction::ShutdownListener)
        }

        // The listener only exists while awaiting the callback
        (FlowState::AwaitingCallback, FlowEvent::Failed(error)) => {
            (FlowState::Failed { error }, FlowAction::ShutdownListener)
        }
        (_, FlowEvent::Failed(error)) => (FlowState::Failed { error }, FlowAction::Abort),

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, FlowAction::None),
    }
}

/// Runs one three-legged handshake to completion.
pub struct AuthorizationFlow {
    config: FlowConfig,
    provider: Arc<dyn OAuthProvider>,
    store: Arc<TokenStore>,
    launcher: Arc<dyn UrlLauncher>,
}

impl AuthorizationFlow {
    pub fn new(
        config: FlowConfig,
        provider: Arc<dyn OAuthProvider>,
        store: Arc<TokenStore>,
        launcher: Arc<dyn UrlLauncher>,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            launcher,
        }
    }

    /// Run the handshake. On success the access token has been saved through
    /// the token store; nothing else is returned.
    pub async fn run(self) -> Result<()> {
        let callback_url = self.config.callback_url();
        let state = FlowState::Idle;

        // --- Idle -> RequestTokenObtained ---
        let request = match self.provider.request_authorization(&callback_url).await {
            Ok(request) => request,
            Err(e) => {
                let (state, _) = handle_event(state, FlowEvent::Failed(e.to_string()));
                debug!(?state, "request token failed");
                return Err(e);
            }
        };
        let (state, action) = handle_event(
            state,
            FlowEvent::RequestTokenIssued {
                authorization_url: request.authorization_url.clone(),
            },
        );
        debug!(?action, "state: RequestTokenObtained");

        // --- RequestTokenObtained -> AwaitingCallback ---
        let listener = match TcpListener::bind(self.config.listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                let err = Error::Callback(format!("failed to bind {}: {e}", self.config.listen_addr));
                let (state, _) = handle_event(state, FlowEvent::Failed(err.to_string()));
                debug!(?state, "callback listener unavailable");
                return Err(err);
            }
        };

        let (done_tx, done_rx) = oneshot::channel();
        let callback_state = CallbackState::new(
            self.provider.clone(),
            self.store.clone(),
            PendingExchange {
                request_token: request.request_token,
                done: done_tx,
            },
        );
        let listener_task = CallbackListener::spawn(
            listener,
            build_callback_router(callback_state, &self.config.callback_path),
        );
        info!(%callback_url, "callback listener ready");

        let (state, action) = handle_event(state, FlowEvent::ListenerReady);
        if let FlowAction::PresentAuthorizationUrl { url } = &action {
            self.present(url);
        }

        // --- AwaitingCallback -> Completed | Failed ---
        let outcome: CallbackOutcome = done_rx.await.unwrap_or_else(|_| {
            Err(Error::Callback(
                "listener stopped before receiving the callback".into(),
            ))
        });
        let event = match &outcome {
            Ok(()) => FlowEvent::CallbackCompleted,
            Err(e) => FlowEvent::Failed(e.to_string()),
        };
        let (state, action) = handle_event(state, event);
        debug!(?action, "stopping callback listener");
        listener_task.stop().await;

        info!(?state, "authorization flow finished");
        outcome
    }

    fn present(&self, url: &str) {
        println!("Please visit: {url}");
        if let Err(e) = self.launcher.open(url) {
            warn!(error = %e, "could not open a browser, open the URL manually");
        }
    }
}

/// The spawned callback server. Dropping it aborts the task, so the
/// listener never outlives the flow even if `run` is cancelled.
struct CallbackListener {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl CallbackListener {
    fn spawn(listener: TcpListener, app: axum::Router) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Signal graceful shutdown and wait for the server task to exit.
    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match (&mut self.handle).await {
            Ok(Ok(())) => debug!("callback listener stopped"),
            Ok(Err(e)) => warn!(error = %e, "callback listener error during shutdown"),
            Err(e) => warn!(error = %e, "callback listener task failed"),
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
