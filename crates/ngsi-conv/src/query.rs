//! Query-string translation
//!
//! Rewrites the inbound gateway query into the backend dialect: gateway-only
//! keys are dropped, quoting conventions differ, the sysAttrs flag becomes
//! a metadata wildcard, and multi-type filters cannot be forwarded at all
//! (the backend has no such filter - the result is checked downstream).

use std::collections::HashMap;

use ngsi_core::TransformFlags;

use crate::subscription::strip_q_quotes;

/// Query keys that only exist in the gateway dialect.
const GATEWAY_ONLY: [&str; 6] = ["options", "scopeQ", "pick", "omit", "format", "count"];

/// Option tokens the backend must never see.
const GATEWAY_ONLY_OPTIONS: [&str; 2] = ["concise", "sysAttrs"];

/// Splits the requested `type` filter into its parts.
pub fn requested_types(query: &HashMap<String, String>) -> Vec<String> {
    query
        .get("type")
        .map(|t| t.split(',').map(String::from).collect())
        .unwrap_or_default()
}

/// Translates the inbound query map into backend query pairs.
pub fn translate(query: &HashMap<String, String>, flags: &TransformFlags) -> Vec<(String, String)> {
    let multi_type = requested_types(query).len() > 1;

    let mut keys: Vec<&String> = query.keys().collect();
    keys.sort();

    let mut out = Vec::new();
    for key in keys {
        if GATEWAY_ONLY.contains(&key.as_str()) {
            continue;
        }
        let value = &query[key];
        match key.as_str() {
            // The backend has no multi-type filter; fetch unfiltered and
            // let the response check reject mismatches.
            "type" if multi_type => {}
            "q" => out.push(("q".to_string(), strip_q_quotes(value))),
            _ => out.push((key.clone(), value.clone())),
        }
    }

    let mut options: Vec<&str> = query
        .get("options")
        .map(|o| {
            o.split(',')
                .filter(|token| !GATEWAY_ONLY_OPTIONS.contains(token))
                .collect()
        })
        .unwrap_or_default();
    // The backend only reports its total count when asked via options
    if flags.count && !options.contains(&"count") {
        options.push("count");
    }
    if !options.is_empty() {
        out.push(("options".to_string(), options.join(",")));
    }

    if flags.sys_attrs {
        out.push(("metadata".to_string(), "dateCreated,dateModified,*".to_string()));
    }

    out
}
