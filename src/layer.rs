use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::dispatcher::EventDispatcher;
use crate::record::{EventContext, ExceptionInfo, LogEvent};
use crate::severity::RawSeverity;

/// `tracing_subscriber` layer that observes events and forwards them to an
/// [`EventDispatcher`] via a bounded channel and background task.
///
/// By default only events at level `ERROR` and above are captured and
/// turned into [`LogEvent`]s. Remote I/O is fully decoupled from
/// application threads: `on_event` only enqueues, the background task
/// dispatches.
pub struct BridgeLayer {
    sender: mpsc::Sender<LogEvent>,
    capture_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into the channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl BridgeLayer {
    /// Create a new layer and spawn a background task that pulls
    /// [`LogEvent`]s from a bounded channel and hands them to the
    /// dispatcher one at a time.
    ///
    /// A minimal threshold is enforced for `buffer` to avoid degenerate
    /// configurations.
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        capture_level: Level,
        buffer: usize,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<LogEvent>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let enqueued_events_bg = Arc::clone(&enqueued_events);

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                enqueued_events_bg.fetch_add(1, Ordering::Relaxed);
                // dispatch() absorbs delivery failures itself; nothing to
                // handle here.
                dispatcher.dispatch(event).await;
            }
        });

        (
            Self {
                sender: tx,
                capture_level,
                total_events,
                enqueued_events,
                dropped_events,
            },
            handle,
        )
    }

    fn convert(&self, event: &Event<'_>) -> LogEvent {
        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut exception: Option<ExceptionInfo> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            exception: &mut exception,
        };
        event.record(&mut visitor);

        let meta = event.metadata();
        LogEvent {
            timestamp: Utc::now(),
            message: message.unwrap_or_default(),
            severity: RawSeverity::Name(meta.level().to_string()),
            channel: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            context: EventContext {
                exception,
                trace: None,
                other: BTreeMap::new(),
            },
            extra: fields,
        }
    }
}

impl<S> Layer<S> for BridgeLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.capture_level {
            return;
        }

        let record = self.convert(event);

        if self.sender.try_send(record).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("error-tracking channel full, dropping log record");
        }
    }
}

use tracing::field::{Field, Visit};

/// Field names that carry the event's "throwable". A value recorded under
/// one of these becomes the [`ExceptionInfo`] that switches the dispatcher
/// onto the exception path.
const EXCEPTION_FIELDS: &[&str] = &["error", "exception"];

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
    pub exception: &'a mut Option<ExceptionInfo>,
}

impl<'a> FieldVisitor<'a> {
    fn is_exception_field(&self, field: &Field) -> bool {
        EXCEPTION_FIELDS.contains(&field.name())
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.is_exception_field(field) {
            *self.exception = Some(ExceptionInfo::from_error(value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else if self.is_exception_field(field) {
            *self.exception = Some(ExceptionInfo::new("Error", value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            *self.message = Some(rendered);
        } else if self.is_exception_field(field) {
            *self.exception = Some(ExceptionInfo::new("Error", rendered));
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(rendered));
        }
    }
}
