use async_trait::async_trait;

use crate::backtrace::Backtrace;
use crate::client::{DeliveryError, EventId, RemoteClient};
use crate::record::ExceptionInfo;
use crate::scope::Scope;
use crate::severity::Severity;

/// A client that simply drops every capture call.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// external I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopClient;

#[async_trait]
impl RemoteClient for NoopClient {
    async fn capture_exception(
        &self,
        _exception: &ExceptionInfo,
        _scope: &Scope,
        _hint: Option<&Backtrace>,
    ) -> Result<Option<EventId>, DeliveryError> {
        Ok(None)
    }

    async fn capture_message(
        &self,
        _message: &str,
        _severity: Severity,
        _scope: &Scope,
        _hint: Option<&Backtrace>,
    ) -> Result<Option<EventId>, DeliveryError> {
        Ok(None)
    }
}
