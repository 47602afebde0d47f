use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::backtrace::StackFrame;
use crate::severity::RawSeverity;

/// One log event as handed to the dispatch pipeline.
///
/// The bundled [`BridgeLayer`](crate::layer::BridgeLayer) builds these from
/// `tracing` events, but the type is public so non-`tracing` hosts can
/// construct records directly. Immutable once handed to the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub message: String,
    /// Severity as supplied by the host: a level name or a platform error
    /// code. Mapped to the wire vocabulary exactly once, at dispatch time.
    pub severity: RawSeverity,
    pub timestamp: DateTime<Utc>,
    /// Channel / source name (the `tracing` target for layer-built events).
    pub channel: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub context: EventContext,
    /// Per-event enrichment shipped alongside the scope on this capture
    /// only; never written into the shared context store.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LogEvent {
    /// Build a minimal message-only event; the remaining fields can be set
    /// directly on the returned value.
    pub fn new(message: impl Into<String>, severity: impl Into<RawSeverity>) -> Self {
        LogEvent {
            message: message.into(),
            severity: severity.into(),
            timestamp: Utc::now(),
            channel: String::new(),
            module_path: None,
            file: None,
            line: None,
            context: EventContext::default(),
            extra: BTreeMap::new(),
        }
    }
}

/// Structured context carried by a single event.
///
/// `exception` switches the dispatcher onto the exception path; `trace` is
/// an explicitly supplied backtrace that takes precedence over every other
/// trace source. Everything else lands in `other` and is shipped as
/// per-event extra data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventContext {
    pub exception: Option<ExceptionInfo>,
    pub trace: Option<Vec<StackFrame>>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// The "throwable" attached to an event: what failed, described well enough
/// for the remote dashboard to group on.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionInfo {
    /// Error type name, e.g. `"io::Error"`. Grouping key on the remote end.
    #[serde(rename = "type")]
    pub type_name: String,
    pub message: String,
    /// The exception's own trace, if the host captured one.
    pub trace: Option<Vec<StackFrame>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            trace: None,
        }
    }

    /// Build from any `std::error::Error`, folding the source chain into
    /// the message the way the remote UI expects a single description.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        ExceptionInfo::new("Error", message)
    }
}
