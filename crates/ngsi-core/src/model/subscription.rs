//! Subscription wire models for both dialects

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity filter item shared by both dialects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityFilter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "idPattern", skip_serializing_if = "Option::is_none")]
    pub id_pattern: Option<String>,
}

/// Gateway-dialect subscription.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LdSubscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityFilter>>,
    #[serde(rename = "watchedAttributes", skip_serializing_if = "Option::is_none")]
    pub watched_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<LdNotificationParams>,
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Notification parameters on the gateway side.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LdNotificationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<LdEndpoint>,
}

/// Where the subscriber really wants notifications delivered.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LdEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
}

/// Backend-dialect subscription.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2Subscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<V2Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<V2Notification>,
}

/// Backend subscription subject.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2Subject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityFilter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<V2Condition>,
}

/// Backend subscription trigger condition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2Condition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<V2Expression>,
}

/// Backend filter expression.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2Expression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

/// Backend notification block.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<String>>,
    #[serde(rename = "attrsFormat", skip_serializing_if = "Option::is_none")]
    pub attrs_format: Option<String>,
    #[serde(rename = "httpCustom", skip_serializing_if = "Option::is_none")]
    pub http_custom: Option<V2HttpCustom>,
}

/// Custom HTTP delivery block: the gateway always points `url` at its own
/// relay endpoint and hides the true target in the headers map.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct V2HttpCustom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}
