use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backtrace::BacktraceBuilder;
use crate::client::{DeliveryError, RemoteClient};
use crate::config::{BridgeConfig, ConfigError};
use crate::guard::DispatchGuard;
use crate::record::LogEvent;
use crate::scope::{normalize_extra_key, ContextStore, User};
use crate::severity::Severity;

/// Host-environment user lookup, e.g. a CMS session or request-local
/// identity. Injected by the host; without one the bridge leaves `user`
/// untouched.
pub trait UserResolver: Send + Sync {
    fn resolve(&self) -> Option<User>;
}

/// The orchestrator of the dispatch pipeline.
///
/// Receives a [`LogEvent`], asks the [`ContextStore`] for the current
/// scope, the [`BacktraceBuilder`] for a trace when configured to, maps
/// the severity, consults the [`DispatchGuard`], and finally invokes the
/// remote client's capture operation. Makes zero or one remote call per
/// event and never lets a delivery failure reach the host application.
pub struct EventDispatcher {
    config: BridgeConfig,
    client: Arc<dyn RemoteClient>,
    store: Arc<ContextStore>,
    guard: DispatchGuard,
    backtraces: BacktraceBuilder,
    user_resolver: Option<Arc<dyn UserResolver>>,
    delivery_failures: AtomicU64,
}

impl EventDispatcher {
    /// Build a dispatcher over the given remote client.
    ///
    /// Fails with [`ConfigError::MissingDsn`] when the config carries no
    /// connection string: a bridge that can never deliver must refuse to
    /// initialize rather than silently no-op.
    ///
    /// Construction seeds the context store from the config: environment,
    /// initial tags and extra data (both normalized on the way in).
    pub fn new(
        config: BridgeConfig,
        client: Arc<dyn RemoteClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = Arc::new(ContextStore::new());
        if let Some(environment) = &config.environment {
            store.set_environment(environment.clone());
        }
        store.merge_tags(config.tags.clone());
        store.merge_extra(config.extra.clone());

        Ok(EventDispatcher {
            config,
            client,
            store,
            guard: DispatchGuard::new(),
            backtraces: BacktraceBuilder::new(),
            user_resolver: None,
            delivery_failures: AtomicU64::new(0),
        })
    }

    pub fn with_user_resolver(mut self, resolver: Arc<dyn UserResolver>) -> Self {
        self.user_resolver = Some(resolver);
        self
    }

    /// Swap in a backtrace builder with host-specific deny-list entries.
    pub fn with_backtrace_builder(mut self, builder: BacktraceBuilder) -> Self {
        self.backtraces = builder;
        self
    }

    /// The shared context store, for hosts that accumulate tags/extra/user
    /// data over the lifetime of a request.
    pub fn context(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Remote calls that failed (timeout, transport error, rejection)
    /// since this dispatcher was built.
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    /// Forward one event to the remote service.
    ///
    /// Never returns an error: a suppressed dispatch returns silently and
    /// a failed delivery is absorbed after being counted. Logging must not
    /// crash the application being monitored.
    pub async fn dispatch(&self, event: LogEvent) {
        let is_exception = event.context.exception.is_some();

        if let Some(resolver) = &self.user_resolver {
            if let Some(user) = resolver.resolve() {
                self.store.set_user(user);
            }
        }

        let hint = if self.config.custom_stacktrace {
            Some(self.backtraces.build(&event))
        } else {
            None
        };

        if !self.guard.should_dispatch(is_exception) {
            return;
        }

        let severity = Severity::from_raw(&event.severity);
        self.store.set_level(severity);

        // Copy the scope before anything awaits; the store lock is never
        // held across I/O.
        let mut scope = self.store.snapshot();

        // Per-event enrichment rides along on this capture only; the
        // shared store is not touched.
        for (key, value) in &event.extra {
            scope.extra.insert(normalize_extra_key(key), value.clone());
        }
        for (key, value) in &event.context.other {
            scope.extra.insert(normalize_extra_key(key), value.clone());
        }

        let capture = async {
            match &event.context.exception {
                Some(exception) => {
                    self.client
                        .capture_exception(exception, &scope, hint.as_ref())
                        .await
                }
                None => {
                    self.client
                        .capture_message(&event.message, severity, &scope, hint.as_ref())
                        .await
                }
            }
        };

        match tokio::time::timeout(self.config.timeout, capture).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => self.record_failure(err),
            Err(_) => self.record_failure(DeliveryError::Timeout),
        }
    }

    /// Best-effort local recording of a delivery failure. Goes to stderr,
    /// never back through the logging pipeline: a failing transport must
    /// not recurse into the very layer that feeds it.
    fn record_failure(&self, err: DeliveryError) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        eprintln!("error-tracking delivery failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop::NoopClient;

    #[test]
    fn construction_requires_a_dsn() {
        let err = EventDispatcher::new(BridgeConfig::new("  "), Arc::new(NoopClient));
        assert!(matches!(err, Err(ConfigError::MissingDsn)));
    }

    #[test]
    fn construction_seeds_the_scope_from_config() {
        let config = BridgeConfig::new("https://key@host/1")
            .with_environment("staging")
            .with_tag("Request-ID", "abc")
            .with_extra("peak-memory", serde_json::json!("4M"));
        let dispatcher = EventDispatcher::new(config, Arc::new(NoopClient)).unwrap();

        let scope = dispatcher.context().snapshot();
        assert_eq!(scope.environment.as_deref(), Some("staging"));
        assert_eq!(
            scope.tags.get("request.id").map(String::as_str),
            Some("abc")
        );
        assert_eq!(
            scope.extra.get("Peak Memory"),
            Some(&serde_json::json!("4M"))
        );
    }
}
