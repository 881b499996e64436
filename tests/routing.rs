use std::time::Duration;

use assert_matches::assert_matches;
use batch_endpoint::{RouteError, RouteLimits, RoutingContext};
use tokio::{join, time::Instant};
use tokio_test::assert_ok;

use crate::types::{Context, PanickingEndpoint, RecordingEndpoint, SlowEndpoint};

mod types;

#[tokio::test]
async fn request_body_returns_reply() {
    let context: Context = RoutingContext::builder("test")
        .route("direct:slow", SlowEndpoint(Duration::ZERO))
        .build()
        .unwrap();

    let template = context.create_producer_template();

    let reply = assert_ok!(template.request_body("direct:slow", "B1".to_string()).await);

    assert_eq!(reply, "B1 handled");
}

/// Given we send a body without waiting for a reply
/// When the context shuts down
/// Then the body has still been handled
#[tokio::test]
async fn send_body_is_handled_before_shutdown() {
    let endpoint = RecordingEndpoint::default();
    let context: Context = RoutingContext::builder("test")
        .route("direct:record", endpoint.clone())
        .build()
        .unwrap();

    let template = context.create_producer_template();
    assert_ok!(template.send_body("direct:record", "B1".to_string()).await);

    context.shut_down().await;
    tokio::time::timeout(Duration::from_secs(1), context.wait_for_shutdown())
        .await
        .expect("Routes should shut down");

    assert_eq!(endpoint.received(), vec!["B1"]);
}

#[tokio::test]
async fn rejects_after_shutdown() {
    let context: Context = RoutingContext::builder("test")
        .route("direct:record", RecordingEndpoint::default())
        .build()
        .unwrap();

    context.shut_down().await;
    tokio::time::timeout(Duration::from_secs(1), context.wait_for_shutdown())
        .await
        .expect("Routes should shut down");

    let result = context
        .create_producer_template()
        .request_body("direct:record", "B1".to_string())
        .await;

    assert_matches!(result, Err(RouteError::Tx));
}

/// Given a context with a request timeout
/// When the endpoint takes longer than that
/// Then the producer gives up
#[tokio::test]
async fn request_timeout() {
    tokio::time::pause();

    let timeout = Duration::from_millis(50);
    let context: Context = RoutingContext::builder("test")
        .route("direct:slow", SlowEndpoint(Duration::from_millis(100)))
        .request_timeout(timeout)
        .build()
        .unwrap();

    let result = context
        .create_producer_template()
        .request_body("direct:slow", "B1".to_string())
        .await;

    assert_matches!(result, Err(RouteError::TimedOut(d)) if d == timeout);
}

/// Given a route limited to one exchange at a time
/// When we send two bodies at once
/// Then the second waits for the first
#[tokio::test]
async fn max_concurrency_limit() {
    tokio::time::pause();

    let handling_dur = Duration::from_millis(50);
    let context: Context = RoutingContext::builder("test")
        .route_with_limits(
            "direct:slow",
            SlowEndpoint(handling_dur),
            RouteLimits::default().with_max_concurrency(1),
        )
        .build()
        .unwrap();

    let template = context.create_producer_template();
    let now = Instant::now();

    let (r1, r2) = join!(
        template.request_body("direct:slow", "B1".to_string()),
        template.request_body("direct:slow", "B2".to_string()),
    );

    assert_eq!(r1.unwrap(), "B1 handled");
    assert_eq!(r2.unwrap(), "B2 handled");
    assert!(
        now.elapsed() >= handling_dur * 2,
        "actual = {:?}, expected at least {:?}",
        now.elapsed(),
        handling_dur * 2
    );
}

/// Given a route with limits far beyond what tokio can track
/// When we send bodies and shut down
/// Then the route still works
#[tokio::test]
async fn unbounded_limits_are_capped() {
    let context: Context = RoutingContext::builder("test")
        .route_with_limits(
            "direct:slow",
            SlowEndpoint(Duration::ZERO),
            RouteLimits::default()
                .with_max_concurrency(usize::MAX)
                .with_queue_size(usize::MAX),
        )
        .build()
        .unwrap();

    let template = context.create_producer_template();

    let reply = assert_ok!(template.request_body("direct:slow", "B1".to_string()).await);
    assert_eq!(reply, "B1 handled");

    context.shut_down().await;
    tokio::time::timeout(Duration::from_secs(1), context.wait_for_shutdown())
        .await
        .expect("Routes should shut down");
}

#[tokio::test]
async fn concurrent_exchanges() {
    tokio::time::pause();

    let handling_dur = Duration::from_millis(50);
    let context: Context = RoutingContext::builder("test")
        .route("direct:slow", SlowEndpoint(handling_dur))
        .build()
        .unwrap();

    let template = context.create_producer_template();
    let now = Instant::now();

    let (r1, r2) = join!(
        template.request_body("direct:slow", "B1".to_string()),
        template.request_body("direct:slow", "B2".to_string()),
    );

    assert!(r1.is_ok());
    assert!(r2.is_ok());
    assert!(
        now.elapsed() < handling_dur * 2,
        "should be handled concurrently, took {:?}",
        now.elapsed()
    );
}

/// A panicking handler fails its own exchange, but the route keeps going.
#[tokio::test]
async fn panic_does_not_stop_route() {
    let context: Context = RoutingContext::builder("test")
        .route("direct:panic", PanickingEndpoint)
        .route("direct:record", RecordingEndpoint::default())
        .build()
        .unwrap();

    let template = context.create_producer_template();

    let r1 = template.request_body("direct:panic", "B1".to_string()).await;
    let r2 = template.request_body("direct:panic", "B2".to_string()).await;
    let r3 = template.request_body("direct:record", "B3".to_string()).await;

    assert_matches!(r1, Err(RouteError::Panic));
    assert_matches!(r2, Err(RouteError::Panic));
    assert_eq!(r3.unwrap(), "B3");
}

#[tokio::test]
async fn uri_scheme_is_case_insensitive() {
    let context: Context = RoutingContext::builder("test")
        .route("direct:record", RecordingEndpoint::default())
        .build()
        .unwrap();

    let reply = context
        .create_producer_template()
        .request_body("DIRECT:record", "B1".to_string())
        .await
        .unwrap();

    assert_eq!(reply, "B1");
    assert_eq!(context.route_handles().len(), 1);
}
