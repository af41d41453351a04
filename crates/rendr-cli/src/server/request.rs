//! Turning an HTTP request into a [`PageRequest`].

use axum::extract::Query;
use axum::http::{Method, Uri};
use rendr_core::{parse_payload, PageRequest, RenderError};
use serde_json::{Map, Value};

/// Methods the renderer answers.
pub const ALLOWED_METHODS: &str = "GET, POST";

pub fn is_allowed(method: &Method) -> bool {
    method == Method::GET || method == Method::POST
}

/// Value of the selector query parameter, percent-decoded.
///
/// When the parameter repeats, the first occurrence wins.
pub fn selector(uri: &Uri, param: &str) -> Option<String> {
    let Query(pairs) = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(query) => query,
        Err(e) => {
            tracing::debug!("Ignoring unreadable query string '{:?}': {}", uri.query(), e);
            return None;
        }
    };
    pairs
        .into_iter()
        .find_map(|(key, value)| (key == param).then_some(value))
}

/// Build the render request.
///
/// The pathname is taken as sent, without percent-decoding. Only POST bodies
/// are read; GET always renders with an empty object.
pub fn parse_request(
    method: &Method,
    uri: &Uri,
    body: &[u8],
    selector_param: &str,
) -> Result<PageRequest, RenderError> {
    let payload = if method == Method::POST {
        parse_payload(body)?
    } else {
        Value::Object(Map::new())
    };

    Ok(PageRequest::new(
        uri.path(),
        selector(uri, selector_param),
        payload,
    ))
}

/// Cache key of a client asset request, relative to the public path.
///
/// Full-URL public paths are served elsewhere, so they never match.
pub fn asset_key(public_path: &str, path: &str) -> Option<String> {
    if public_path.contains("://") {
        return None;
    }

    let rest = path.strip_prefix(public_path.trim_end_matches('/'))?;
    if rest.starts_with('/') && rest.len() > 1 {
        Some(rest.to_string())
    } else {
        None
    }
}
