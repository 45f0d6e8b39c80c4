//! ngsi-client - HTTP transport for the adapter
//!
//! Provides the reqwest-backed implementations of the `ngsi-core` broker
//! and notification-sink traits: [`V2Client`] talks to the NGSI-v2 context
//! broker, [`HttpRelay`] forwards translated notifications to subscriber
//! endpoints. Both apply a fixed timeout and never retry.

pub mod client;

pub use client::{HttpRelay, V2Client};
