use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::backtrace::Backtrace;
use crate::record::ExceptionInfo;
use crate::scope::Scope;
use crate::severity::Severity;

/// Identifier assigned to a delivered event, echoed by (or generated for)
/// the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(Uuid);

impl EventId {
    /// Generate a fresh client-side id.
    pub fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        EventId::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Failure of one outbound capture call.
///
/// Always absorbed at the dispatcher boundary; implementations should
/// surface failures through this type rather than swallowing them, so the
/// dispatcher can count them.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("remote call timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("remote service rejected the event: {0}")]
    Rejected(String),
}

/// The opaque remote-SDK boundary.
///
/// Concrete bindings ([`HttpTransport`](crate::transport::HttpTransport),
/// [`NoopClient`](crate::noop::NoopClient), test mocks) implement this;
/// the dispatch pipeline depends only on the trait. Both operations are
/// called from a background task with an already-copied scope snapshot, so
/// implementations may block on network I/O freely.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Report an exception, with the scope snapshot and an optional
    /// pre-built backtrace hint.
    async fn capture_exception(
        &self,
        exception: &ExceptionInfo,
        scope: &Scope,
        hint: Option<&Backtrace>,
    ) -> Result<Option<EventId>, DeliveryError>;

    /// Report a plain message at the given wire severity.
    async fn capture_message(
        &self,
        message: &str,
        severity: Severity,
        scope: &Scope,
        hint: Option<&Backtrace>,
    ) -> Result<Option<EventId>, DeliveryError>;
}
