//! ngsi-core - Core types for the NGSI-LD to NGSI-v2 adapter
//!
//! This crate provides the dialect-neutral data model shared by the
//! transcoders, the immutable gateway configuration, and the abstractions
//! over the downstream NGSI-v2 context broker.

pub mod broker;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;

pub use broker::{BrokerRequest, BrokerResponse, ContextBroker, NotificationSink, Verb};
pub use config::GatewayConfig;
pub use error::TransportError;
pub use model::*;
