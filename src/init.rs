use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::client::RemoteClient;
use crate::config::{BridgeConfig, ConfigError};
use crate::dispatcher::EventDispatcher;
use crate::layer::BridgeLayer;

/// Initialize the global `tracing` subscriber with a [`BridgeLayer`] wired
/// to the given remote client.
///
/// **Parameters**
/// - `config`: [`BridgeConfig`] carrying the DSN, scope seeds and layer
///   tuning (capture level, channel buffer).
/// - `client`: the [`RemoteClient`] binding that receives captures.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   stacked on top so events are also printed to the console.
///
/// **Returns**
/// - The shared [`EventDispatcher`], so hosts can keep enriching the
///   context store (tags, user, extra) after installation.
/// - `Err(ConfigError::MissingDsn)` when the config carries no DSN; the
///   bridge refuses to install rather than silently no-op.
///
/// Installs a [`Registry`] combined with the layer as the global default
/// subscriber, so all `tracing` events in the process are observed.
pub fn init_bridge_with_options(
    config: BridgeConfig,
    client: Arc<dyn RemoteClient>,
    enable_stdout: bool,
) -> Result<Arc<EventDispatcher>, ConfigError> {
    let capture_level = config.capture_level;
    let channel_buffer = config.channel_buffer;

    let dispatcher = Arc::new(EventDispatcher::new(config, client)?);
    let (layer, _handle) = BridgeLayer::new(Arc::clone(&dispatcher), capture_level, channel_buffer);

    if enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }

    Ok(dispatcher)
}

/// Initialize the bridge with sensible defaults.
///
/// Equivalent to [`init_bridge_with_options`] with console output enabled.
/// This is the recommended entrypoint for typical services.
pub fn init_bridge(
    config: BridgeConfig,
    client: Arc<dyn RemoteClient>,
) -> Result<Arc<EventDispatcher>, ConfigError> {
    init_bridge_with_options(config, client, true)
}
