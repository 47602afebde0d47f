//! Connection smoke test: issues one message per known severity level
//! through a fully-wired bridge.
//!
//! Usage:
//!   BRIDGE_DSN=https://key@errors.example.com/1 \
//!     cargo run --example test_connection

use std::sync::Arc;

use tracing_error_bridge::{BridgeConfig, EventDispatcher, HttpTransport, LogEvent, Severity};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BridgeConfig::from_env()?.with_environment("smoke-test");

    let transport = Arc::new(HttpTransport::new(&config)?);
    let dispatcher = EventDispatcher::new(config, transport)?;
    dispatcher.context().merge_tags([("origin", "test-connection")]);

    // One message per host-logger level, the way the original connectivity
    // check walked its logger's level table.
    for level in ["NOTICE", "WARN", "ERR", "EMERG"] {
        let message = format!(
            "testing severity level {} (wire: {})",
            level,
            Severity::from_level_name(level)
        );
        println!("sending: {}", message);
        dispatcher.dispatch(LogEvent::new(message, level)).await;
    }

    let failures = dispatcher.delivery_failures();
    if failures == 0 {
        println!("all severity levels delivered; check the remote dashboard");
    } else {
        println!("{} delivery failures, see stderr for details", failures);
    }

    Ok(())
}
