use std::fmt::{self, Debug, Display};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{
    context::RoutingContext,
    error::{ConfigError, ProcessError},
    item::ItemProcessor,
    producer::ProducerTemplate,
    properties::{BatchProperties, JobParameters},
    uri::EndpointUri,
};

/// The batch property naming the endpoint that items are forwarded to.
pub const ENDPOINT_PROPERTY: &str = "endpoint";

/// An [`ItemProcessor`] which forwards each item to an endpoint and returns the endpoint's reply
/// as the processed item.
///
/// The endpoint URI comes from the `endpoint` batch property, typically set from a job parameter:
///
/// ```text
/// endpoint = #{jobParameters['endpoint']}
/// ```
///
/// The processor is opened by [`initialize`](Self::initialize), or on the first item if the host
/// never calls it. Opening resolves the endpoint URI and creates a producer template from the
/// routing context, unless one was supplied with
/// [`with_producer_template`](Self::with_producer_template). This happens exactly once, even if
/// called concurrently.
///
/// Errors from the endpoint are returned unchanged. Retrying, skipping and so on are up to the
/// batch step.
pub struct EndpointItemProcessor<B, R, E: Display> {
    context: RoutingContext<B, R, E>,
    properties: BatchProperties,
    job_parameters: JobParameters,
    supplied_template: Option<ProducerTemplate<B, R, E>>,

    opened: OnceCell<Opened<B, R, E>>,
}

struct Opened<B, R, E: Display> {
    endpoint_uri: String,
    producer_template: ProducerTemplate<B, R, E>,
}

impl<B, R, E: Display> EndpointItemProcessor<B, R, E> {
    /// Create an unopened processor.
    pub fn new(
        context: RoutingContext<B, R, E>,
        properties: BatchProperties,
        job_parameters: JobParameters,
    ) -> Self {
        Self {
            context,
            properties,
            job_parameters,
            supplied_template: None,
            opened: OnceCell::new(),
        }
    }

    /// Use this producer template instead of creating one from the routing context.
    pub fn with_producer_template(mut self, template: ProducerTemplate<B, R, E>) -> Self {
        self.supplied_template = Some(template);
        self
    }

    /// Resolve the endpoint and obtain a producer template, if not already done.
    ///
    /// On error the processor stays unopened, so a later call can try again.
    pub async fn initialize(&self) -> Result<(), ConfigError> {
        self.open().await.map(|_| ())
    }

    /// Whether the processor has been opened.
    pub fn is_initialized(&self) -> bool {
        self.opened.initialized()
    }

    /// The resolved endpoint URI. `None` until opened.
    pub fn endpoint_uri(&self) -> Option<&str> {
        self.opened.get().map(|o| o.endpoint_uri.as_str())
    }

    /// The producer template in use. `None` until opened.
    pub fn producer_template(&self) -> Option<&ProducerTemplate<B, R, E>> {
        self.opened.get().map(|o| &o.producer_template)
    }

    /// The routing context items are sent through.
    pub fn context(&self) -> &RoutingContext<B, R, E> {
        &self.context
    }

    async fn open(&self) -> Result<&Opened<B, R, E>, ConfigError> {
        self.opened
            .get_or_try_init(|| async { self.resolve() })
            .await
    }

    fn resolve(&self) -> Result<Opened<B, R, E>, ConfigError> {
        let endpoint_uri = self
            .properties
            .resolve_required(ENDPOINT_PROPERTY, &self.job_parameters)?;
        EndpointUri::parse(&endpoint_uri)?;

        let producer_template = match &self.supplied_template {
            Some(template) => template.clone(),
            None => self.context.create_producer_template(),
        };

        info!(
            processor = %format_args!("{:p}", self),
            endpoint = endpoint_uri.as_str(),
            context = self.context.name(),
            producer_template = producer_template.id(),
            "Opened endpoint item processor"
        );

        Ok(Opened {
            endpoint_uri,
            producer_template,
        })
    }
}

#[async_trait]
impl<B, R, E> ItemProcessor for EndpointItemProcessor<B, R, E>
where
    B: 'static + Send,
    R: 'static + Send,
    E: 'static + Send + Display + Debug,
{
    type Input = B;
    type Output = R;
    type Error = ProcessError<E>;

    async fn process_item(&self, item: B) -> Result<R, ProcessError<E>> {
        let opened = self.open().await?;

        let output = opened
            .producer_template
            .request_body(&opened.endpoint_uri, item)
            .await?;

        Ok(output)
    }
}

impl<B, R, E: Display> Debug for EndpointItemProcessor<B, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointItemProcessor")
            .field("context", &self.context.name())
            .field("endpoint", &self.endpoint_uri())
            .field(
                "producer_template",
                &self.producer_template().map(|t| t.id()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointItemProcessor;
    use crate::{
        endpoint_fn, BatchProperties, ItemProcessor, JobParameters, RoutingContext,
        ENDPOINT_PROPERTY,
    };

    #[tokio::test]
    async fn opens_on_first_item() {
        let context = RoutingContext::builder("ctx")
            .route(
                "direct:len",
                endpoint_fn(|s: String| async move { Ok::<_, String>(s.len()) }),
            )
            .build()
            .unwrap();

        let processor = EndpointItemProcessor::new(
            context,
            BatchProperties::new().with(ENDPOINT_PROPERTY, "direct:len"),
            JobParameters::new(),
        );
        assert!(!processor.is_initialized());

        let output = processor.process_item("four".to_string()).await.unwrap();

        assert_eq!(output, 4);
        assert!(processor.is_initialized());
        assert_eq!(processor.endpoint_uri(), Some("direct:len"));
    }
}
