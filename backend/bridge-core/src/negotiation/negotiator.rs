//! Negotiation service.
//!
//! # Channel path
//!
//! The first [`ProxyNegotiator::request_config`] call spawns one background
//! task that sends `base_url_request` and then waits on the config cell. The
//! task's outcome is wrapped in a `Shared` future stored on the negotiator;
//! every call awaits a clone of it under its own timeout. A timeout drops
//! only that clone: the spawned task keeps running, so a later call sees the
//! late answer of the same request and no second request is ever sent.
//!
//! # Listener path
//!
//! [`ProxyNegotiator::request_config_via_listener`] binds a fresh
//! [`ListenerSession`], advertises its port, and runs it on its own task
//! until it accepts one valid answer or its deadline passes.

use crate::channel::KernelChannel;
use crate::config::{BridgeConfig, NegotiationMode};
use crate::error::negotiation::NegotiationError;
use crate::listener::ListenerSession;
use crate::negotiation::config_state::ConfigState;
use crate::negotiation::handler::message_handler;
use crate::negotiation::{NEGOTIATE_OPERATION, REQUEST_CONFIG_OPERATION};
use crate::protocol::{KernelRequest, NegotiatedConfig, ProxyConfig};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::spawn as TokioSpawn;
use tokio::task::AbortHandle;
use tokio::time::{Instant, timeout as TokioTimeout};

type TaskOutcome = Result<NegotiatedConfig, NegotiationError>;
type SharedOutcome = Shared<BoxFuture<'static, TaskOutcome>>;

/// The in-flight channel negotiation.
struct NegotiationTask {
    outcome: SharedOutcome,
    abort: AbortHandle,
}

/// Negotiates and holds the proxy config for one kernel process.
pub struct ProxyNegotiator<C: KernelChannel> {
    channel: Arc<C>,
    state: ConfigState,
    config: BridgeConfig,
    task: Mutex<Option<NegotiationTask>>,
}

impl<C: KernelChannel> ProxyNegotiator<C> {
    /// Create the negotiator and register its handler on `channel`.
    pub fn new(channel: Arc<C>, config: BridgeConfig) -> Self {
        let state = ConfigState::new();
        channel.on_message(message_handler(state.clone()));

        Self {
            channel,
            state,
            config,
            task: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn state(&self) -> &ConfigState {
        &self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Negotiate using the configured [`NegotiationMode`].
    pub async fn negotiate(&self, timeout: Option<Duration>) -> Result<(), NegotiationError> {
        match self.config.negotiation.mode {
            NegotiationMode::Channel => self.request_config(timeout).await,
            NegotiationMode::Listener => self.request_config_via_listener(timeout).await,
        }
    }

    /// Ask the frontend for its config over the channel and wait up to `timeout`.
    ///
    /// Safe to call repeatedly: the request is sent once and every call waits
    /// on the same outcome.
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::NotReady`] if no answer arrived within `timeout`
    /// - [`NegotiationError::Transport`] if the request could not be sent; the
    ///   next call sends it again
    pub async fn request_config(&self, timeout: Option<Duration>) -> Result<(), NegotiationError> {
        if !self.channel.is_attached() {
            debug!("No frontend attached, skipping negotiation");
            return Ok(());
        }

        if self.state.is_resolved() {
            return Ok(());
        }

        let timeout = timeout.unwrap_or(self.config.negotiation.request_timeout);
        let outcome = self.negotiation_task();

        match TokioTimeout(timeout, outcome.clone()).await {
            Ok(Ok(config)) => {
                info!(
                    "Negotiated proxy config: server_url={}, base_subpath={}, frontend={}",
                    config.server_url, config.base_subpath, config.frontend
                );
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Negotiation failed: {e}");
                self.discard_task(&outcome);
                Err(e)
            }
            Err(_) => {
                info!("No proxy config within {timeout:?}, request stays pending");
                Err(NegotiationError::not_ready(REQUEST_CONFIG_OPERATION))
            }
        }
    }

    /// Ask the frontend to POST its config to a one-shot loopback listener.
    ///
    /// Each call runs a fresh listener session bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::Listener`] if the listener could not be bound
    /// - [`NegotiationError::Transport`] if the port could not be advertised
    /// - [`NegotiationError::NotReady`] if no valid answer arrived in time
    pub async fn request_config_via_listener(
        &self,
        timeout: Option<Duration>,
    ) -> Result<(), NegotiationError> {
        if !self.channel.is_attached() {
            debug!("No frontend attached, skipping negotiation");
            return Ok(());
        }

        if self.state.is_resolved() {
            return Ok(());
        }

        let timeout = timeout.unwrap_or(self.config.negotiation.request_timeout);
        let session = ListenerSession::bind(&self.config.listener, self.state.clone()).await?;
        let port = session.port();

        self.channel.send(KernelRequest::ajax(port).into()).await?;
        info!("Sent base_url_request_ajax to frontend (port {port})");

        let deadline = Instant::now() + timeout;
        let config = TokioSpawn(session.serve_until(deadline))
            .await
            .map_err(|e| NegotiationError::Task {
                message: format!("listener session failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })??;

        info!(
            "Negotiated proxy config via listener: server_url={}, frontend={}",
            config.server_url, config.frontend
        );
        Ok(())
    }

    /// The negotiated configuration. Never waits.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::NotReady`] when a frontend is attached but
    /// negotiation has not completed.
    pub fn get_config(&self) -> Result<ProxyConfig, NegotiationError> {
        if !self.channel.is_attached() {
            return Ok(ProxyConfig::Detached);
        }

        self.state
            .snapshot()
            .map(ProxyConfig::Negotiated)
            .ok_or_else(|| NegotiationError::not_ready(NEGOTIATE_OPERATION))
    }

    /// Best-effort send to the frontend, reopening the channel first.
    pub async fn send(&self, message: Value) -> Result<(), NegotiationError> {
        self.channel.open().await?;
        self.channel.send(message).await?;
        Ok(())
    }

    /// Abandon the current attempt: the in-flight task is aborted and the
    /// stored config cleared, so the next `request_config` sends a new request.
    pub fn restart(&self) {
        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = previous {
            task.abort.abort();
        }
        self.state.reset();
        info!("Proxy config negotiation restarted");
    }

    /// The shared outcome of the channel task, spawning the task on first use.
    fn negotiation_task(&self) -> SharedOutcome {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.as_ref() {
            return task.outcome.clone();
        }

        let channel = Arc::clone(&self.channel);
        let mut observer = self.state.observe();
        let handle = TokioSpawn(async move {
            channel.send(KernelRequest::BaseUrlRequest.into()).await?;
            info!("Sent base_url_request to frontend");
            observer.wait().await
        });

        let abort = handle.abort_handle();
        let outcome = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(NegotiationError::Task {
                    message: format!("negotiation task ended: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                }),
            }
        }
        .boxed()
        .shared();

        *slot = Some(NegotiationTask {
            outcome: outcome.clone(),
            abort,
        });
        outcome
    }

    /// Forget a failed task so the next call starts over.
    fn discard_task(&self, outcome: &SharedOutcome) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|task| task.outcome.ptr_eq(outcome))
        {
            *slot = None;
        }
    }
}
