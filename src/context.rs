use std::{
    collections::HashMap,
    fmt::{self, Debug, Display},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::info;

use crate::{
    endpoint::Endpoint,
    error::{ConfigError, RouteError, RouteResult},
    limits::RouteLimits,
    producer::ProducerTemplate,
    route::{Exchange, RouteDropGuard, RouteHandle, RouteWorker},
    uri::EndpointUri,
};

/// A shared registry of routes, keyed by endpoint URI.
///
/// Each route is served by a background worker task which hands bodies to its [`Endpoint`].
/// Producers send bodies to routes through a [`ProducerTemplate`] created from the context.
///
/// Cheap to clone. Cloned instances share the same routes.
///
/// ## Drop
///
/// When the last instance of a `RoutingContext` (including those held by producer templates) is
/// dropped, the route workers are aborted.
///
/// If you want to shut down gracefully, call [`RoutingContext::shut_down()`].
pub struct RoutingContext<B, R, E: Display> {
    inner: Arc<ContextInner<B, R, E>>,
}

struct ContextInner<B, R, E: Display> {
    name: String,
    routes: HashMap<EndpointUri, Route<B, R, E>>,
    request_timeout: Option<Duration>,
    next_template_id: AtomicU64,
}

struct Route<B, R, E: Display> {
    exchange_tx: mpsc::Sender<Exchange<B, R, E>>,
    handle: RouteHandle,
    _guard: RouteDropGuard,
}

type SpawnRoute<B, R, E> = Box<dyn FnOnce(String) -> Route<B, R, E> + Send>;

/// Builds a [`RoutingContext`].
pub struct RoutingContextBuilder<B, R, E: Display> {
    name: String,
    request_timeout: Option<Duration>,
    routes: Vec<(String, SpawnRoute<B, R, E>)>,
}

impl<B, R, E> RoutingContext<B, R, E>
where
    B: 'static + Send,
    R: 'static + Send,
    E: 'static + Send + Display + Debug,
{
    /// Start building a routing context with the given name.
    pub fn builder(name: impl Into<String>) -> RoutingContextBuilder<B, R, E> {
        RoutingContextBuilder {
            name: name.into(),
            request_timeout: None,
            routes: Vec::new(),
        }
    }
}

impl<B, R, E: Display> RoutingContext<B, R, E> {
    /// The name of this context.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// How long producers wait for a reply before giving up. `None` means wait indefinitely.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.inner.request_timeout
    }

    /// Whether a route is registered for the URI.
    pub fn has_route(&self, uri: &str) -> bool {
        EndpointUri::parse(uri)
            .map(|uri| self.inner.routes.contains_key(&uri))
            .unwrap_or(false)
    }

    /// The URIs of all registered routes, sorted.
    pub fn route_uris(&self) -> Vec<String> {
        let mut uris: Vec<_> = self.inner.routes.keys().map(ToString::to_string).collect();
        uris.sort();
        uris
    }

    /// Create a new producer template for sending bodies to routes in this context.
    ///
    /// Each template gets a unique id.
    pub fn create_producer_template(&self) -> ProducerTemplate<B, R, E> {
        let id = self.inner.next_template_id.fetch_add(1, Ordering::Relaxed);
        ProducerTemplate::new(id, self.clone())
    }

    /// Handles to every route's worker.
    pub fn route_handles(&self) -> Vec<RouteHandle> {
        self.inner
            .routes
            .values()
            .map(|route| route.handle.clone())
            .collect()
    }

    /// Signal every route to shut down after handling queued and in-flight exchanges.
    pub async fn shut_down(&self) {
        for route in self.inner.routes.values() {
            route.handle.shut_down().await;
        }
    }

    /// Wait for every route to finish.
    pub async fn wait_for_shutdown(&self) {
        for route in self.inner.routes.values() {
            route.handle.wait_for_shutdown().await;
        }
    }

    pub(crate) fn exchange_tx(&self, uri: &str) -> RouteResult<&mpsc::Sender<Exchange<B, R, E>>, E> {
        EndpointUri::parse(uri)
            .ok()
            .and_then(|parsed| self.inner.routes.get(&parsed))
            .map(|route| &route.exchange_tx)
            .ok_or_else(|| RouteError::NoSuchEndpoint(uri.to_string()))
    }
}

impl<B, R, E> RoutingContextBuilder<B, R, E>
where
    B: 'static + Send,
    R: 'static + Send,
    E: 'static + Send + Display + Debug,
{
    /// Add a route with default [`RouteLimits`].
    pub fn route<H>(self, uri: impl Into<String>, endpoint: H) -> Self
    where
        H: Endpoint<Body = B, Reply = R, Error = E>,
    {
        self.route_with_limits(uri, endpoint, RouteLimits::default())
    }

    /// Add a route.
    pub fn route_with_limits<H>(
        mut self,
        uri: impl Into<String>,
        endpoint: H,
        limits: RouteLimits,
    ) -> Self
    where
        H: Endpoint<Body = B, Reply = R, Error = E>,
    {
        let spawn: SpawnRoute<B, R, E> = Box::new(move |uri| {
            let (handle, guard, exchange_tx) = RouteWorker::spawn(uri, endpoint, limits);
            Route {
                exchange_tx,
                handle,
                _guard: guard,
            }
        });
        self.routes.push((uri.into(), spawn));
        self
    }

    /// Give up waiting for a reply after the given duration.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate the routes and start their workers.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Result<RoutingContext<B, R, E>, ConfigError> {
        let mut parsed = Vec::with_capacity(self.routes.len());
        for (uri, spawn) in self.routes {
            let uri = EndpointUri::parse(&uri)?;
            if parsed.iter().any(|(existing, _)| existing == &uri) {
                return Err(ConfigError::DuplicateRoute(uri.to_string()));
            }
            parsed.push((uri, spawn));
        }

        let routes: HashMap<_, _> = parsed
            .into_iter()
            .map(|(uri, spawn)| {
                let route = spawn(uri.to_string());
                (uri, route)
            })
            .collect();

        info!(
            context = %self.name,
            routes = routes.len(),
            request_timeout = ?self.request_timeout,
            "Routing context started"
        );

        Ok(RoutingContext {
            inner: Arc::new(ContextInner {
                name: self.name,
                routes,
                request_timeout: self.request_timeout,
                next_template_id: AtomicU64::new(0),
            }),
        })
    }
}

impl<B, R, E: Display> Clone for RoutingContext<B, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, R, E: Display> Debug for RoutingContext<B, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingContext")
            .field("name", &self.inner.name)
            .field("routes", &self.route_uris())
            .field("request_timeout", &self.inner.request_timeout)
            .finish()
    }
}

impl<B, R, E: Display> Display for RoutingContext<B, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
