//! Forward batch items to an endpoint and use the reply as the processed item.
//!
//! A batch step reads items one at a time, processes each, and writes the outputs. Sometimes the
//! processing belongs somewhere else: in a route that is shared with other parts of the
//! application. [`EndpointItemProcessor`] is an [`ItemProcessor`] that hands each item to a named
//! endpoint in a [`RoutingContext`] and returns whatever the endpoint replies with.
//!
//! Each route is served by a background worker task. Producers send bodies to routes through a
//! [`ProducerTemplate`], and wait for the reply.
//!
//! See the README for an example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod context;
mod endpoint;
pub mod error;
mod item;
mod limits;
mod processor;
mod producer;
pub mod properties;
mod route;
mod uri;

pub use context::{RoutingContext, RoutingContextBuilder};
pub use endpoint::{endpoint_fn, Endpoint, FnEndpoint};
pub use error::{ConfigError, ProcessError, RouteError};
pub use item::ItemProcessor;
pub use limits::RouteLimits;
pub use processor::{EndpointItemProcessor, ENDPOINT_PROPERTY};
pub use producer::ProducerTemplate;
pub use properties::{BatchProperties, JobParameters};
pub use route::RouteHandle;
pub use uri::EndpointUri;
