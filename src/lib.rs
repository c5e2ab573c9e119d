/// Process settings loaded from the environment.
pub mod config;
/// Common error types: setup, transport, configuration, logging.
pub mod error;
/// Diagnostic logging (format, layer, file sink).
pub mod logging;
/// Network transport: framing, listeners, ingress and egress sides.
pub mod network;
/// Forwarding proxy and its lifecycle.
pub mod proxy;
/// Pub/Sub endpoints: topics, frames, publisher, subscriber.
pub mod pubsub;
/// Role tasks, supervision and shutdown signals.
pub mod runtime;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{Settings, SubscriberSettings};
/// Operation errors and result types.
pub use error::{ConfigError, LoggingError, RelayError, RelayResult, SetupError, TransportError};
/// Logging initialization.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Forwarding proxy.
pub use proxy::{BoundAddrs, ForwarderHandle, ForwarderState, ProxyConfig, ProxyForwarder};
/// Pub/Sub API.
pub use pubsub::{
    matches, Frame, PublishSchedule, PublisherEndpoint, SubscriberEndpoint, SubscriberOptions,
    TopicFilter,
};
/// Process runtime.
pub use runtime::{wait_for_shutdown_signal, Delivery, RelayReport, RunningRelay, Supervisor};
