use std::{
    fmt::{self, Debug, Display},
    future::Future,
    marker::PhantomData,
};

/// Handle bodies sent to a route, producing a reply for each.
///
/// Should be cheap to clone. Each exchange is handled on a clone, possibly concurrently with
/// other exchanges for the same route.
pub trait Endpoint: 'static + Send + Sync + Clone {
    /// The request body.
    type Body: 'static + Send;
    /// The reply sent back to the producer.
    type Reply: 'static + Send;
    /// The error type that can be returned when handling a body.
    type Error: 'static + Send + Display + Debug;

    /// Handle one body.
    fn handle(
        &self,
        body: Self::Body,
    ) -> impl Future<Output = Result<Self::Reply, Self::Error>> + Send;
}

/// An [`Endpoint`] backed by an async function. See [`endpoint_fn`].
pub struct FnEndpoint<F, B, R, E> {
    f: F,
    _phantom: PhantomData<fn(B) -> Result<R, E>>,
}

/// Create an [`Endpoint`] from an async function or closure.
///
/// ```
/// use batch_endpoint::endpoint_fn;
///
/// let upper = endpoint_fn(|body: String| async move { Ok::<_, String>(body.to_uppercase()) });
/// # let _ = upper;
/// ```
pub fn endpoint_fn<F, Fut, B, R, E>(f: F) -> FnEndpoint<F, B, R, E>
where
    F: Fn(B) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    FnEndpoint {
        f,
        _phantom: PhantomData,
    }
}

impl<F, Fut, B, R, E> Endpoint for FnEndpoint<F, B, R, E>
where
    F: 'static + Send + Sync + Clone + Fn(B) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send,
    B: 'static + Send,
    R: 'static + Send,
    E: 'static + Send + Display + Debug,
{
    type Body = B;
    type Reply = R;
    type Error = E;

    fn handle(&self, body: B) -> impl Future<Output = Result<R, E>> + Send {
        (self.f)(body)
    }
}

impl<F: Clone, B, R, E> Clone for FnEndpoint<F, B, R, E> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<F, B, R, E> Debug for FnEndpoint<F, B, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint").finish_non_exhaustive()
    }
}
