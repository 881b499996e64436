use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use batch_endpoint::{
    BatchProperties, Endpoint, EndpointItemProcessor, JobParameters, RoutingContext,
    ENDPOINT_PROPERTY,
};

pub type Context = RoutingContext<String, String, String>;

/// Echoes each body, remembering what it received.
#[derive(Debug, Clone, Default)]
pub struct RecordingEndpoint {
    received: Arc<Mutex<Vec<String>>>,
}

impl RecordingEndpoint {
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl Endpoint for RecordingEndpoint {
    type Body = String;
    type Reply = String;
    type Error = String;

    async fn handle(&self, body: String) -> Result<String, String> {
        self.received.lock().unwrap().push(body.clone());
        Ok(body)
    }
}

/// Always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingEndpoint(pub String);

impl Endpoint for FailingEndpoint {
    type Body = String;
    type Reply = String;
    type Error = String;

    async fn handle(&self, _body: String) -> Result<String, String> {
        Err(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct PanickingEndpoint;

impl Endpoint for PanickingEndpoint {
    type Body = String;
    type Reply = String;
    type Error = String;

    async fn handle(&self, body: String) -> Result<String, String> {
        panic!("Handler panic for body: {}", body);
    }
}

/// Takes a while, then replies with the body plus a suffix.
#[derive(Debug, Clone)]
pub struct SlowEndpoint(pub Duration);

impl Endpoint for SlowEndpoint {
    type Body = String;
    type Reply = String;
    type Error = String;

    async fn handle(&self, body: String) -> Result<String, String> {
        tokio::time::sleep(self.0).await;
        Ok(body + " handled")
    }
}

pub fn processor_for(
    context: &Context,
    endpoint: &str,
) -> EndpointItemProcessor<String, String, String> {
    EndpointItemProcessor::new(
        context.clone(),
        BatchProperties::new().with(ENDPOINT_PROPERTY, endpoint),
        JobParameters::new(),
    )
}
