//! Negotiated-config state with write-once completion.
//!
//! This module holds the configuration the frontend reported and the
//! completion signal of the outstanding negotiation attempt.
//!
//! # Architecture
//!
//! - The value lives in a `tokio::sync::watch` channel: `Empty` until the
//!   first resolution, `Resolved(config)` afterwards
//! - The sender is the owning handle, shared by every `ConfigState` clone;
//!   writes go through [`ConfigState::resolve`], which refuses a second
//!   resolution instead of overwriting
//! - Waiters hold a [`CompletionObserver`] (a receiver). Dropping an observer,
//!   e.g. when a timed wait gives up, never affects the stored value or the
//!   task that will eventually resolve it
//! - Reads ([`ConfigState::snapshot`]) are synchronous and never wait

use crate::error::negotiation::NegotiationError;
use crate::protocol::NegotiatedConfig;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

/// Single-assignment result cell for one negotiation attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Completion {
    #[default]
    Empty,
    Resolved(NegotiatedConfig),
}

impl Completion {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Completion::Resolved(_))
    }
}

/// Shared negotiated-config container.
///
/// This type is `Clone`; all clones share the same cell.
#[derive(Clone)]
pub struct ConfigState {
    completion: Arc<watch::Sender<Completion>>,
}

impl ConfigState {
    pub fn new() -> Self {
        let (completion, _) = watch::channel(Completion::Empty);
        Self {
            completion: Arc::new(completion),
        }
    }

    /// Store the negotiated config and wake every observer.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::DoubleResolution`] if this attempt was
    /// already resolved. The stored value is left untouched.
    #[track_caller]
    pub fn resolve(&self, config: NegotiatedConfig) -> Result<(), NegotiationError> {
        let location = ErrorLocation::from(Location::caller());
        let server_url = config.server_url.clone();
        let mut existing_url = None;

        self.completion.send_if_modified(|current| match current {
            Completion::Empty => {
                *current = Completion::Resolved(config);
                true
            }
            Completion::Resolved(existing) => {
                existing_url = Some(existing.server_url.clone());
                false
            }
        });

        match existing_url {
            None => {
                info!("Proxy config resolved: server_url={server_url}");
                Ok(())
            }
            Some(existing_url) => Err(NegotiationError::DoubleResolution {
                message: format!(
                    "proxy config already resolved (server_url={existing_url}), rejected server_url={server_url}"
                ),
                location,
            }),
        }
    }

    /// The negotiated config, if this attempt has resolved.
    pub fn snapshot(&self) -> Option<NegotiatedConfig> {
        match &*self.completion.borrow() {
            Completion::Empty => None,
            Completion::Resolved(config) => Some(config.clone()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.completion.borrow().is_resolved()
    }

    /// A new observer of this cell.
    pub fn observe(&self) -> CompletionObserver {
        CompletionObserver {
            receiver: self.completion.subscribe(),
        }
    }

    /// Start a new attempt: the cell goes back to `Empty`.
    pub(crate) fn reset(&self) {
        if let Completion::Resolved(previous) = self.completion.send_replace(Completion::Empty) {
            warn!(
                "Discarding negotiated proxy config (server_url={})",
                previous.server_url
            );
        }
    }
}

impl Default for ConfigState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle that can wait for the cell to resolve.
#[derive(Clone)]
pub struct CompletionObserver {
    receiver: watch::Receiver<Completion>,
}

impl CompletionObserver {
    /// Wait until the cell is resolved. Returns immediately if it already is.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::Task`] if every [`ConfigState`] was dropped
    /// before a resolution arrived.
    pub async fn wait(&mut self) -> Result<NegotiatedConfig, NegotiationError> {
        let resolved = self
            .receiver
            .wait_for(Completion::is_resolved)
            .await
            .map_err(|_| NegotiationError::Task {
                message: "config state dropped before negotiation completed".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        match &*resolved {
            Completion::Resolved(config) => Ok(config.clone()),
            Completion::Empty => Err(NegotiationError::Task {
                message: "completion observed without a value".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
