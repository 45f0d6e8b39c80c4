//! Subscription transcoding
//!
//! Besides the structural mapping, two details matter: the backend never
//! sees the subscriber's real endpoint (it is always rewritten to the
//! gateway's relay, with the true target tucked into a custom header), and
//! the two dialects disagree on whether string literals in `q` filters are
//! quoted.

use serde_json::json;

use ngsi_core::constants::URN_PREFIX;
use ngsi_core::{
    EntityFilter, LdEndpoint, LdNotificationParams, LdSubscription, V2Condition, V2Expression,
    V2HttpCustom, V2Notification, V2Subject, V2Subscription,
};

/// Removes the quote characters the gateway dialect puts around string
/// literals; the backend expects them bare.
pub fn strip_q_quotes(q: &str) -> String {
    q.replace('"', "").replace("%22", "")
}

/// Re-quotes string-literal operands of `==` comparisons.
///
/// Deliberately a heuristic, not an expression parser: numeric operands
/// stay bare, everything else is wrapped in `%22` markers, and operators
/// other than `==` pass through untouched.
pub fn requote_q(q: &str) -> String {
    q.split(';')
        .map(|clause| match clause.split_once("==") {
            Some((lhs, rhs)) if !rhs.is_empty() && rhs.parse::<f64>().is_err() => {
                format!("{lhs}==%22{rhs}%22")
            }
            _ => clause.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Converts a gateway subscription into the backend dialect.
///
/// `relay_url` is the gateway's own notification endpoint; it replaces the
/// subscriber endpoint unconditionally.
pub fn ld_to_v2(sub: &LdSubscription, relay_url: &str) -> V2Subscription {
    let q = sub
        .q
        .as_deref()
        .map(strip_q_quotes)
        .filter(|q| !q.is_empty());

    let entities = sub.entities.as_ref().map(|list| {
        list.iter()
            .map(|entity| {
                if entity.id.is_none() && entity.entity_type.is_some() && entity.id_pattern.is_none()
                {
                    EntityFilter {
                        entity_type: entity.entity_type.clone(),
                        id: None,
                        id_pattern: Some(".*".to_string()),
                    }
                } else {
                    entity.clone()
                }
            })
            .collect::<Vec<_>>()
    });

    let condition = if q.is_some() || sub.watched_attributes.is_some() {
        Some(V2Condition {
            attrs: sub.watched_attributes.clone(),
            expression: q.map(|q| V2Expression { q: Some(q) }),
        })
    } else {
        None
    };

    let subject = if entities.is_some() || condition.is_some() {
        Some(V2Subject {
            entities,
            condition,
        })
    } else {
        None
    };

    let notification = sub.notification.as_ref().map(|params| {
        let http_custom = params.endpoint.as_ref().and_then(|endpoint| {
            endpoint.uri.as_ref().map(|uri| {
                let mut headers = std::collections::BTreeMap::new();
                headers.insert("target".to_string(), uri.clone());
                if let Some(accept) = &endpoint.accept {
                    headers.insert("target_accept".to_string(), accept.clone());
                }
                V2HttpCustom {
                    url: Some(relay_url.to_string()),
                    headers: Some(headers),
                }
            })
        });
        V2Notification {
            attrs: params.attributes.clone(),
            attrs_format: params.format.clone(),
            http_custom,
        }
    });

    V2Subscription {
        id: None,
        subscription_type: Some("Subscription".to_string()),
        description: sub.description.clone(),
        subject,
        notification,
    }
}

/// Converts a backend subscription into the gateway dialect.
///
/// Only relay-managed subscriptions (those carrying the custom HTTP
/// delivery block) are meaningful on the gateway side; the caller filters
/// for them before listing.
pub fn v2_to_ld(sub: &V2Subscription, jsonld: bool, user_context: &str) -> LdSubscription {
    let subject = sub.subject.clone().unwrap_or_default();
    let condition = subject.condition.unwrap_or_default();
    let notification = sub.notification.clone().unwrap_or_default();
    let headers = notification
        .http_custom
        .as_ref()
        .and_then(|custom| custom.headers.clone())
        .unwrap_or_default();

    let entities = subject.entities.map(|list| {
        list.into_iter()
            .map(|mut entity| {
                // A catch-all pattern is implicit on the gateway side
                if entity.id_pattern.as_deref() == Some(".*") {
                    entity.id_pattern = None;
                }
                entity
            })
            .collect::<Vec<_>>()
    });

    LdSubscription {
        id: Some(format!(
            "{URN_PREFIX}Subscription:{}",
            sub.id.as_deref().unwrap_or_default()
        )),
        subscription_type: Some("Subscription".to_string()),
        description: sub.description.clone(),
        entities,
        watched_attributes: condition.attrs,
        q: condition
            .expression
            .and_then(|expr| expr.q)
            .map(|q| requote_q(&q)),
        notification: Some(LdNotificationParams {
            attributes: notification.attrs,
            format: notification.attrs_format,
            endpoint: Some(LdEndpoint {
                uri: headers.get("target").cloned(),
                accept: Some(
                    headers
                        .get("target_accept")
                        .cloned()
                        .unwrap_or_else(|| "application/json".to_string()),
                ),
            }),
        }),
        context: jsonld.then(|| json!(user_context)),
    }
}
