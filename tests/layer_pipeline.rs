use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_error_bridge::backtrace::Backtrace;
use tracing_error_bridge::{
    BridgeConfig, BridgeLayer, DeliveryError, EventDispatcher, EventId, ExceptionInfo,
    RemoteClient, Scope, Severity,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[derive(Debug, Clone)]
enum Captured {
    Message(String, Severity),
    Exception(String),
}

#[derive(Default)]
struct RecordingClient {
    captured: Mutex<Vec<Captured>>,
}

impl RecordingClient {
    fn captured(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    /// Wait for the background dispatch task to process `n` captures.
    async fn wait_for(&self, n: usize) {
        for _ in 0..100 {
            if self.captured.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "timed out waiting for {} captures, saw {:?}",
            n,
            self.captured()
        );
    }
}

#[async_trait]
impl RemoteClient for RecordingClient {
    async fn capture_exception(
        &self,
        exception: &ExceptionInfo,
        _scope: &Scope,
        _hint: Option<&Backtrace>,
    ) -> Result<Option<EventId>, DeliveryError> {
        self.captured
            .lock()
            .unwrap()
            .push(Captured::Exception(exception.message.clone()));
        Ok(None)
    }

    async fn capture_message(
        &self,
        message: &str,
        severity: Severity,
        _scope: &Scope,
        _hint: Option<&Backtrace>,
    ) -> Result<Option<EventId>, DeliveryError> {
        self.captured
            .lock()
            .unwrap()
            .push(Captured::Message(message.to_string(), severity));
        Ok(None)
    }
}

fn wired_layer(
    client: Arc<RecordingClient>,
    capture_level: tracing::Level,
) -> (BridgeLayer, Arc<EventDispatcher>) {
    let config = BridgeConfig::new("https://key@errors.example.com/1");
    let dispatcher =
        Arc::new(EventDispatcher::new(config, client as Arc<dyn RemoteClient>).unwrap());
    let (layer, _handle) = BridgeLayer::new(Arc::clone(&dispatcher), capture_level, 64);
    (layer, dispatcher)
}

#[tokio::test(flavor = "multi_thread")]
async fn error_events_flow_through_to_the_client() {
    let client = Arc::new(RecordingClient::default());
    let (layer, _dispatcher) = wired_layer(client.clone(), tracing::Level::ERROR);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::error!("database connection lost");
    });

    client.wait_for(1).await;
    match &client.captured()[0] {
        // `tracing`'s ERROR maps to the wire's fatal bucket.
        Captured::Message(message, severity) => {
            assert_eq!(message, "database connection lost");
            assert_eq!(*severity, Severity::Fatal);
        }
        other => panic!("expected a message capture, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn events_below_the_capture_level_are_ignored() {
    let client = Arc::new(RecordingClient::default());
    let (layer, _dispatcher) = wired_layer(client.clone(), tracing::Level::ERROR);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!("just a warning");
        tracing::info!("just info");
        tracing::error!("the real problem");
    });

    client.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.captured().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn warn_capture_level_maps_warn_to_warning() {
    let client = Arc::new(RecordingClient::default());
    let (layer, _dispatcher) = wired_layer(client.clone(), tracing::Level::WARN);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!("disk almost full");
    });

    client.wait_for(1).await;
    match &client.captured()[0] {
        Captured::Message(_, severity) => assert_eq!(*severity, Severity::Warning),
        other => panic!("expected a message capture, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn an_error_field_switches_onto_the_exception_path() {
    let client = Arc::new(RecordingClient::default());
    let (layer, _dispatcher) = wired_layer(client.clone(), tracing::Level::ERROR);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        tracing::error!(error = %err, "write failed");
    });

    client.wait_for(1).await;
    match &client.captured()[0] {
        Captured::Exception(message) => assert_eq!(message, "disk on fire"),
        other => panic!("expected an exception capture, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_error_events_are_dispatched_at_most_once() {
    let client = Arc::new(RecordingClient::default());
    let (layer, _dispatcher) = wired_layer(client.clone(), tracing::Level::ERROR);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        // The double-fire the guard exists for: one logical error arriving
        // twice through the logging framework.
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        tracing::error!(error = %err, "request failed");
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        tracing::error!(error = %err, "request failed");
    });

    client.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.captured().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn layer_counters_track_enqueued_events() {
    let client = Arc::new(RecordingClient::default());
    let (layer, _dispatcher) = wired_layer(client.clone(), tracing::Level::ERROR);
    let total = Arc::clone(&layer.total_events);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::error!("one");
        tracing::info!("not captured");
    });

    client.wait_for(1).await;
    assert_eq!(total.load(std::sync::atomic::Ordering::Relaxed), 2);
}
