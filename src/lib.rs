//! Bridge between the `tracing` facade and a remote error-tracking
//! service.
//!
//! The crate intercepts log events, enriches them with scoped context
//! (environment, tags, extra data, user identity, stack trace) and
//! forwards them over an opaque [`client::RemoteClient`] boundary, with
//! at-most-once delivery per dispatcher instance and without ever letting
//! a delivery failure reach the host application.

pub mod backtrace;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod env;
pub mod guard;
pub mod init;
pub mod layer;
pub mod noop;
pub mod record;
pub mod scope;
pub mod severity;

#[cfg(feature = "http")]
pub mod transport;

pub use client::{DeliveryError, EventId, RemoteClient};
pub use config::{BridgeConfig, ConfigError};
pub use dispatcher::{EventDispatcher, UserResolver};
pub use init::{init_bridge, init_bridge_with_options};
pub use layer::BridgeLayer;
pub use record::{EventContext, ExceptionInfo, LogEvent};
pub use scope::{ContextStore, Scope, UnknownFieldError, User};
pub use severity::{RawSeverity, Severity};

#[cfg(feature = "http")]
pub use transport::{Dsn, DsnError, HttpTransport};
