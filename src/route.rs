use std::{fmt::Display, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore},
    task::{JoinError, JoinHandle},
};
use tracing::{debug, info, span, Instrument, Level, Span};

use crate::{
    endpoint::Endpoint,
    error::{RouteError, RouteResult},
    limits::RouteLimits,
};

/// A body travelling to a route, with somewhere to send the reply.
#[derive(Debug)]
pub(crate) struct Exchange<B, R, E: Display> {
    pub body: B,
    /// Used to send the reply back. `None` when the producer does not wait for a reply.
    pub reply_tx: Option<SendReply<R, E>>,
    /// The exchange was sent as part of this span.
    pub requesting_span: Span,
}

pub(crate) type SendReply<R, E> = oneshot::Sender<RouteResult<R, E>>;

pub(crate) struct RouteWorker<H: Endpoint> {
    uri: String,
    endpoint: H,

    /// Used to receive new exchanges.
    exchange_rx: mpsc::Receiver<Exchange<H::Body, H::Reply, H::Error>>,

    /// Used to receive messages related to shutdown.
    shutdown_rx: mpsc::Receiver<ShutdownMessage>,

    /// Used to signal to listeners that the route has shut down.
    shutdown_notifiers: Vec<oneshot::Sender<()>>,

    limits: RouteLimits,
    /// One permit per exchange being handled.
    permits: Arc<Semaphore>,
}

pub(crate) enum ShutdownMessage {
    Register(ShutdownNotifier),
    ShutDown,
}

pub(crate) struct ShutdownNotifier(oneshot::Sender<()>);

/// A handle to a route's worker task.
///
/// Used for shutting down the route and waiting for it to finish.
#[derive(Debug, Clone)]
pub struct RouteHandle {
    uri: String,
    shutdown_tx: mpsc::Sender<ShutdownMessage>,
}

/// Aborts the worker task when dropped.
#[derive(Debug)]
pub(crate) struct RouteDropGuard {
    handle: JoinHandle<()>,
}

impl<H: Endpoint> RouteWorker<H> {
    /// Spawn a worker for the route. Must be called within a Tokio runtime.
    pub fn spawn(
        uri: String,
        endpoint: H,
        limits: RouteLimits,
    ) -> (
        RouteHandle,
        RouteDropGuard,
        mpsc::Sender<Exchange<H::Body, H::Reply, H::Error>>,
    ) {
        let (exchange_tx, exchange_rx) = mpsc::channel(limits.queue_size);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let mut worker = RouteWorker {
            uri: uri.clone(),
            endpoint,

            exchange_rx,

            shutdown_rx,
            shutdown_notifiers: Vec::new(),

            limits,
            permits: Arc::new(Semaphore::new(limits.max_concurrency)),
        };

        let handle = tokio::spawn(async move {
            worker.run().await;
        });

        (
            RouteHandle { uri, shutdown_tx },
            RouteDropGuard { handle },
            exchange_tx,
        )
    }

    /// Handle an exchange in its own task, once there is capacity to do so.
    async fn dispatch(&mut self, exchange: Exchange<H::Body, H::Reply, H::Error>) {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            // We never close the semaphore.
            Err(_) => return,
        };

        let endpoint = self.endpoint.clone();
        let uri = self.uri.clone();

        let handle_span = span!(Level::INFO, "handle", route.uri = %uri);
        handle_span.follows_from(&exchange.requesting_span);

        tokio::spawn(
            handle_exchange(endpoint, uri, exchange.body, exchange.reply_tx, permit)
                .instrument(handle_span),
        );
    }

    /// Start running the worker event loop.
    async fn run(&mut self) {
        info!(route.uri = %self.uri, limits = %self.limits, "Route started");

        loop {
            tokio::select! {
                Some(msg) = self.shutdown_rx.recv() => {
                    match msg {
                        ShutdownMessage::Register(notifier) => {
                            self.shutdown_notifiers.push(notifier.0);
                        }
                        ShutdownMessage::ShutDown => {
                            // Stop accepting new exchanges, but keep draining the queued ones.
                            self.exchange_rx.close();
                        }
                    }
                }

                exchange = self.exchange_rx.recv() => {
                    match exchange {
                        Some(exchange) => self.dispatch(exchange).await,
                        None => break,
                    }
                }
            }
        }

        // Wait for in-flight exchanges to finish.
        let in_flight = u32::try_from(self.limits.max_concurrency).unwrap_or(u32::MAX);
        let _ = self.permits.acquire_many(in_flight).await;

        info!(route.uri = %self.uri, "Route is shutting down");
    }
}

async fn handle_exchange<H: Endpoint>(
    endpoint: H,
    uri: String,
    body: H::Body,
    reply_tx: Option<SendReply<H::Reply, H::Error>>,
    _permit: OwnedSemaphorePermit,
) {
    // Spawn a task so we can catch panics.
    let reply = tokio::spawn(async move { endpoint.handle(body).await }.in_current_span())
        .await
        .map_err(join_error_to_route_error)
        .and_then(|r| r.map_err(RouteError::Failed));

    if let Some(reply_tx) = reply_tx {
        if reply_tx.send(reply).is_err() {
            // Whatever was waiting for the reply must have gone away. Presumably it doesn't care
            // anymore, but we log here anyway. There's not much else we can do.
            debug!(route.uri = %uri, "Unable to send reply over oneshot channel. Receiver deallocated.");
        }
    } else if let Err(err) = reply {
        debug!(route.uri = %uri, error = %err, "In-only exchange failed");
    }
}

fn join_error_to_route_error<E: Display>(join_err: JoinError) -> RouteError<E> {
    if join_err.is_cancelled() {
        RouteError::Cancelled
    } else {
        RouteError::Panic
    }
}

impl RouteHandle {
    /// The URI of the route.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Signal the route to shut down after handling any queued and in-flight exchanges.
    ///
    /// New exchanges are rejected with [`RouteError::Tx`] from this point on.
    pub async fn shut_down(&self) {
        // We ignore errors here - if the receiver has gone away, the route is already shut down.
        let _ = self.shutdown_tx.send(ShutdownMessage::ShutDown).await;
    }

    /// Wait for the route to finish.
    pub async fn wait_for_shutdown(&self) {
        // We ignore errors here - if the receiver has gone away, the route is already shut down.
        let (notifier_tx, notifier_rx) = oneshot::channel();
        let _ = self
            .shutdown_tx
            .send(ShutdownMessage::Register(ShutdownNotifier(notifier_tx)))
            .await;
        // Wait for the notifier to be dropped.
        let _ = notifier_rx.await;
    }
}

impl Drop for RouteDropGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
