//! Per-request representation flags

use std::collections::HashMap;

/// How a single response should be represented.
///
/// Parsed from the `options`/`format` query parameters, the projection
/// parameters, and the `Prefer` header. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct TransformFlags {
    /// Include (and default) the system timestamps
    pub sys_attrs: bool,
    /// Concise representation: drop attribute `type` tags, collapse bare
    /// values
    pub concise: bool,
    /// Values-only representation; backend bodies are already compatible
    pub key_values: bool,
    /// The request targets a single attribute rather than an entity
    pub attrs_only: bool,
    /// Projection allow-list; `None` when the parameter was absent
    pub pick: Option<Vec<String>>,
    /// Projection deny-list
    pub omit: Vec<String>,
    /// The client asked for a result count
    pub count: bool,
    /// Requested offset, for pagination-link synthesis
    pub offset: usize,
    /// Raw declared protocol version from the `Prefer` header
    pub version: Option<String>,
}

impl TransformFlags {
    /// Parses the flags from the request query map.
    ///
    /// `attrs_only` is a property of the route, not the query, so the
    /// caller supplies it.
    pub fn from_query(query: &HashMap<String, String>, attrs_only: bool) -> Self {
        let options: Vec<&str> = query
            .get("options")
            .map(|o| o.split(',').collect())
            .unwrap_or_default();
        let format = query.get("format").map(String::as_str);

        Self {
            sys_attrs: options.contains(&"sysAttrs"),
            concise: options.contains(&"concise") || format == Some("concise"),
            key_values: options.contains(&"keyValues")
                || options.contains(&"simplified")
                || format == Some("keyValues")
                || format == Some("simplified"),
            attrs_only,
            pick: query.get("pick").map(|p| split_list(p)),
            omit: query.get("omit").map(|o| split_list(o)).unwrap_or_default(),
            count: query.get("count").map(String::as_str) == Some("true"),
            offset: query
                .get("offset")
                .and_then(|o| o.parse().ok())
                .unwrap_or(0),
            version: None,
        }
    }

    /// Whether the projection keeps `key`.
    ///
    /// `omit` always wins; `pick`, when present, restricts the remainder.
    /// The `id` and `type` fields are immune to projection.
    pub fn keeps(&self, key: &str) -> bool {
        if key == "id" || key == "type" {
            return true;
        }
        if self.omit.iter().any(|o| o == key) {
            return false;
        }
        match &self.pick {
            Some(picks) => picks.iter().any(|p| p == key),
            None => true,
        }
    }

    /// Swaps `pick` and `omit`. The purge operation interprets the
    /// projection parameters inversely: picked attributes are the ones to
    /// remove.
    pub fn swap_projection(&mut self) {
        let picked = self.pick.take().unwrap_or_default();
        let omitted = std::mem::take(&mut self.omit);
        self.omit = picked;
        self.pick = if omitted.is_empty() { None } else { Some(omitted) };
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_options_and_format() {
        let flags = TransformFlags::from_query(&query(&[("options", "sysAttrs,concise")]), false);
        assert!(flags.sys_attrs);
        assert!(flags.concise);
        assert!(!flags.key_values);

        let flags = TransformFlags::from_query(&query(&[("format", "simplified")]), false);
        assert!(flags.key_values);
    }

    #[test]
    fn omit_beats_pick() {
        let flags = TransformFlags::from_query(&query(&[("pick", "a,b"), ("omit", "b")]), false);
        assert!(flags.keeps("a"));
        assert!(!flags.keeps("b"));
        assert!(!flags.keeps("c"));
        assert!(flags.keeps("id"));
    }

    #[test]
    fn absent_pick_keeps_everything_not_omitted() {
        let flags = TransformFlags::from_query(&query(&[("omit", "b")]), false);
        assert!(flags.keeps("a"));
        assert!(flags.keeps("c"));
        assert!(!flags.keeps("b"));
    }

    #[test]
    fn purge_swaps_the_projection() {
        let mut flags = TransformFlags::from_query(&query(&[("pick", "a")]), false);
        flags.swap_projection();
        assert_eq!(flags.omit, vec!["a".to_string()]);
        assert!(flags.pick.is_none());
    }
}
