//! Application state shared across all handlers

use std::sync::Arc;

use ngsi_core::{ContextBroker, GatewayConfig, NotificationSink};

/// Shared state: the immutable configuration plus the outbound transports.
///
/// The transports are trait objects so that handler tests can substitute
/// mock implementations.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide configuration, fixed at startup
    pub config: Arc<GatewayConfig>,
    /// Transport to the NGSI-v2 context broker
    pub broker: Arc<dyn ContextBroker>,
    /// Outbound delivery of translated notifications
    pub relay: Arc<dyn NotificationSink>,
}

impl AppState {
    /// Creates the state from its parts.
    pub fn new(
        config: GatewayConfig,
        broker: Arc<dyn ContextBroker>,
        relay: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            broker,
            relay,
        }
    }
}
