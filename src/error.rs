//! Errors.

use std::{fmt::Display, time::Duration};

use thiserror::Error;
use tokio::sync::{mpsc::error::SendError, oneshot::error::RecvError};

/// An error that occurred while sending a body to an endpoint.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RouteError<E: Display> {
    /// No route is registered for the endpoint URI.
    #[error("No endpoint registered for URI '{0}'")]
    NoSuchEndpoint(String),

    /// Something went wrong while handing the body to the route.
    ///
    /// Unrecoverable. The route has shut down.
    #[error("Unable to send body to the route: channel closed")]
    Tx,

    /// Something went wrong while waiting for the reply.
    ///
    /// Unrecoverable.
    #[error("Error while waiting for the reply: channel closed. {0}")]
    Rx(#[from] RecvError),

    /// No reply arrived within the routing context's request timeout.
    #[error("No reply within {0:?}")]
    TimedOut(Duration),

    /// The endpoint returned an error.
    #[error("The endpoint failed: {0}")]
    Failed(E),

    /// The endpoint handler panicked.
    #[error("The endpoint handler panicked")]
    Panic,

    /// The exchange was cancelled before completion.
    #[error("The exchange was cancelled")]
    Cancelled,
}

/// Result of sending a body to an endpoint.
pub type RouteResult<T, E> = std::result::Result<T, RouteError<E>>;

impl<T, E: Display> From<SendError<T>> for RouteError<E> {
    fn from(_tx_err: SendError<T>) -> Self {
        RouteError::Tx
    }
}

impl<E> RouteError<E>
where
    E: Display,
{
    /// Get the inner error returned by the endpoint, otherwise self.
    pub fn inner(self) -> RouteResult<E, E> {
        match self {
            RouteError::Failed(source) => Ok(source),
            _ => Err(self),
        }
    }
}

/// Invalid or missing configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required batch property was not set, or resolved to nothing.
    #[error("Missing required property '{0}'")]
    MissingProperty(String),

    /// An endpoint URI could not be parsed.
    #[error("Invalid endpoint URI '{uri}': {reason}")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A property value contains an expression without a closing brace.
    #[error("Malformed expression in property value '{0}'")]
    MalformedExpression(String),

    /// A property value uses an expression operator other than `jobParameters`.
    #[error("Unsupported expression '{0}'")]
    UnsupportedExpression(String),

    /// Two routes were registered with the same URI.
    #[error("A route is already registered for URI '{0}'")]
    DuplicateRoute(String),
}

/// An error returned by the endpoint item processor.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ProcessError<E: Display> {
    /// The processor could not be initialized.
    #[error("Item processor initialization failed: {0}")]
    Config(#[from] ConfigError),

    /// Forwarding the item to the endpoint failed.
    #[error("{0}")]
    Route(RouteError<E>),
}

impl<E: Display> From<RouteError<E>> for ProcessError<E> {
    fn from(route_err: RouteError<E>) -> Self {
        ProcessError::Route(route_err)
    }
}

impl<E> ProcessError<E>
where
    E: Display,
{
    /// Get the inner error returned by the endpoint, otherwise self.
    pub fn inner(self) -> Result<E, Self> {
        match self {
            ProcessError::Route(route_err) => route_err.inner().map_err(ProcessError::Route),
            _ => Err(self),
        }
    }
}
