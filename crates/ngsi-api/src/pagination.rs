//! Pagination-link synthesis
//!
//! The backend reports the total match count in a header; when the
//! returned page is a strict subset, `prev`/`next` links are derived from
//! the requested offset and the page size, preserving the rest of the
//! original query string.

use axum::http::{header, HeaderMap, HeaderValue};

use ngsi_core::{BrokerResponse, PageWindow, TransformFlags};

/// Adds the count header and pagination links for a list response.
///
/// `returned` is the element count of the translated payload, `None` when
/// the payload was not an array. Does nothing when the backend did not
/// report a total (pagination is disabled for the response).
pub fn apply(
    headers: &mut HeaderMap,
    backend: &BrokerResponse,
    returned: Option<usize>,
    flags: &TransformFlags,
    path_and_query: &str,
) {
    let Some(total) = backend.total_count else {
        return;
    };

    // Only when the client explicitly asked to count
    if flags.count {
        if let Ok(value) = HeaderValue::from_str(&total.to_string()) {
            headers.insert("NGSILD-Results-Count", value);
        }
    }

    let Some(returned) = returned else {
        return;
    };
    let window = PageWindow {
        offset: flags.offset,
        returned,
        total,
    };

    if window.has_prev() {
        append_link(headers, path_and_query, window.prev_offset(), "prev");
    }
    if window.has_next() {
        append_link(headers, path_and_query, window.next_offset(), "next");
    }
}

fn append_link(headers: &mut HeaderMap, path_and_query: &str, offset: usize, rel: &str) {
    let url = with_offset(path_and_query, offset);
    if let Ok(value) = HeaderValue::from_str(&format!("<{url}>; rel=\"{rel}\"")) {
        headers.append(header::LINK, value);
    }
}

/// Rebuilds the request URL with the `offset` parameter replaced.
fn with_offset(path_and_query: &str, offset: usize) -> String {
    let (path, query) = path_and_query
        .split_once('?')
        .unwrap_or((path_and_query, ""));
    let mut params: Vec<String> = query
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("offset="))
        .map(String::from)
        .collect();
    params.push(format!("offset={offset}"));
    format!("{path}?{}", params.join("&"))
}
