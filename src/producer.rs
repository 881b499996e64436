use std::fmt::{self, Debug, Display};

use tokio::sync::oneshot;
use tracing::{span, Instrument, Level, Span};

use crate::{
    context::RoutingContext,
    error::{RouteError, RouteResult},
    route::Exchange,
};

/// Sends bodies to routes in a [`RoutingContext`].
///
/// Cheap to clone. Clones keep the same id.
pub struct ProducerTemplate<B, R, E: Display> {
    id: u64,
    context: RoutingContext<B, R, E>,
}

impl<B, R, E: Display> ProducerTemplate<B, R, E> {
    pub(crate) fn new(id: u64, context: RoutingContext<B, R, E>) -> Self {
        Self { id, context }
    }

    /// Identifies this template within its context.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The context this template sends to.
    pub fn context(&self) -> &RoutingContext<B, R, E> {
        &self.context
    }
}

impl<B, R, E> ProducerTemplate<B, R, E>
where
    B: 'static + Send,
    R: 'static + Send,
    E: 'static + Send + Display + Debug,
{
    /// Send a body to the endpoint and wait for the reply.
    ///
    /// Waits at most the context's request timeout, if one is set.
    pub async fn request_body(&self, uri: &str, body: B) -> RouteResult<R, E> {
        let request_span = span!(Level::INFO, "request", route.uri = uri, template.id = self.id);

        let request = async {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.send_exchange(uri, body, Some(reply_tx)).await?;

            let reply: RouteResult<R, E> = reply_rx.await?;
            reply
        };

        match self.context.request_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, request.instrument(request_span))
                .await
                .map_err(|_elapsed| RouteError::TimedOut(timeout))?,
            None => request.instrument(request_span).await,
        }
    }

    /// Send a body to the endpoint without waiting for a reply.
    ///
    /// Returns once the route has accepted the body. Failures while handling it are only logged.
    pub async fn send_body(&self, uri: &str, body: B) -> RouteResult<(), E> {
        let send_span = span!(Level::INFO, "send", route.uri = uri, template.id = self.id);

        self.send_exchange(uri, body, None)
            .instrument(send_span)
            .await
    }

    async fn send_exchange(
        &self,
        uri: &str,
        body: B,
        reply_tx: Option<oneshot::Sender<RouteResult<R, E>>>,
    ) -> RouteResult<(), E> {
        let exchange_tx = self.context.exchange_tx(uri)?;

        exchange_tx
            .send(Exchange {
                body,
                reply_tx,
                requesting_span: Span::current(),
            })
            .await?;

        Ok(())
    }
}

impl<B, R, E: Display> Clone for ProducerTemplate<B, R, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            context: self.context.clone(),
        }
    }
}

impl<B, R, E: Display> Debug for ProducerTemplate<B, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerTemplate")
            .field("id", &self.id)
            .field("context", &self.context.name())
            .finish()
    }
}
