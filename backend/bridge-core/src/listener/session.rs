use crate::config::ListenerSettings;
use crate::error::negotiation::NegotiationError;
use crate::error::reply::MalformedReply;
use crate::listener::{reply, validation};
use crate::negotiation::{ConfigState, LISTENER_OPERATION};
use crate::protocol::NegotiatedConfig;

use common::ErrorLocation;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::time::{Instant, timeout as TokioTimeout};

/// State shared between the accept loop and the connection tasks.
struct SessionShared {
    state: ConfigState,
    max_content_length: usize,
}

/// A bound listener waiting for one configuration POST.
///
/// Dropping the session (or finishing [`ListenerSession::serve_until`])
/// closes the socket.
pub struct ListenerSession {
    listener: TcpListener,
    port: u16,
    settings: ListenerSettings,
    shared: Arc<SessionShared>,
}

impl ListenerSession {
    /// Bind an ephemeral port on `settings.bind_host`.
    pub async fn bind(settings: &ListenerSettings, state: ConfigState) -> Result<Self, NegotiationError> {
        let listener = TcpListener::bind((settings.bind_host.as_str(), 0)).await?;
        let port = listener.local_addr()?.port();
        info!("Config listener bound on {}:{port}", settings.bind_host);

        Ok(Self {
            listener,
            port,
            settings: settings.clone(),
            shared: Arc::new(SessionShared {
                state,
                max_content_length: settings.max_content_length,
            }),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept connections until the config state resolves or `deadline`
    /// passes.
    ///
    /// Each connection is served on its own task, so an idle socket never
    /// holds up the answer. The state may also be resolved by the channel
    /// handler while the session runs; that ends the session too.
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::NotReady`] if the deadline passed first
    pub async fn serve_until(self, deadline: Instant) -> Result<NegotiatedConfig, NegotiationError> {
        let mut observer = self.shared.state.observe();

        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!("Config listener on port {} expired without a reply", self.port);
                return Err(NegotiationError::not_ready(LISTENER_OPERATION));
            }

            let wait = self.settings.poll_interval.min(deadline - now);
            let accepted = tokio::select! {
                biased;
                _ = observer.wait() => break,
                accepted = TokioTimeout(wait, self.listener.accept()) => accepted,
            };

            let (stream, peer) = match accepted {
                Err(_) => continue,
                Ok(Err(e)) => {
                    warn!("Accept failed on config listener: {e}");
                    continue;
                }
                Ok(Ok(connection)) => connection,
            };

            if !peer.ip().is_loopback() {
                warn!("Dropping connection from non-loopback peer {peer}");
                continue;
            }

            let budget = self
                .settings
                .connection_timeout
                .min(deadline.saturating_duration_since(Instant::now()));
            TokioSpawn(serve_connection(Arc::clone(&self.shared), stream, peer, budget));
        }

        info!("Config listener on port {} closed", self.port);
        self.shared.state.snapshot().ok_or_else(|| NegotiationError::Task {
            message: "listener stopped without a configuration".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

async fn serve_connection(shared: Arc<SessionShared>, stream: TcpStream, peer: SocketAddr, budget: Duration) {
    let service = service_fn(move |request: Request<Incoming>| {
        let shared = Arc::clone(&shared);
        async move { Ok::<_, Infallible>(shared.handle(request).await) }
    });

    let connection = http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service);

    match TokioTimeout(budget, connection).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Connection from {peer} ended with error: {e}"),
        Err(_) => debug!("Connection from {peer} exceeded {budget:?}, dropped"),
    }
}

impl SessionShared {
    async fn handle(&self, request: Request<Incoming>) -> Response<reply::ReplyBody> {
        if request.method() == Method::OPTIONS {
            return reply::preflight();
        }

        if request.method() != Method::POST {
            debug!("Rejecting {} request on config listener", request.method());
            return reply::error(StatusCode::METHOD_NOT_ALLOWED, "Only POST is accepted");
        }

        if let Err(reason) = validation::check_headers(request.headers(), self.max_content_length) {
            return self.reject(&reason);
        }

        let body = match Limited::new(request.into_body(), self.max_content_length)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return self.reject(&MalformedReply::ContentTooLarge {
                    max: self.max_content_length,
                });
            }
            Err(e) => {
                return self.reject(&MalformedReply::BodyRead {
                    reason: e.to_string(),
                });
            }
        };

        let config = match validation::parse_body(&body) {
            Ok(config) => config,
            Err(reason) => return self.reject(&reason),
        };

        match self.state.resolve(config) {
            Ok(()) => reply::success(),
            Err(e) => {
                error!("{e}");
                reply::error(
                    StatusCode::CONFLICT,
                    "Proxy configuration already negotiated",
                )
            }
        }
    }

    fn reject(&self, reason: &MalformedReply) -> Response<reply::ReplyBody> {
        warn!("Rejected config POST: {reason}");
        reply::rejection(reason)
    }
}
