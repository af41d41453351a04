//! Per-request render inputs.

use crate::error::RenderError;
use serde_json::{Map, Value};

/// Inputs handed to a render backend for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// URL path of the request, used as the application route
    pub pathname: String,
    /// JSON context supplied in the request body
    pub payload: Value,
}

impl RenderContext {
    pub fn new(pathname: impl Into<String>, payload: Value) -> Self {
        Self {
            pathname: pathname.into(),
            payload,
        }
    }

    /// Context object exposed to the framework renderer:
    /// `{ pathname, <key>: payload }`.
    pub fn to_framework_context(&self, key: &str) -> Value {
        let mut context = Map::new();
        context.insert("pathname".to_string(), Value::String(self.pathname.clone()));
        context.insert(key.to_string(), self.payload.clone());
        Value::Object(context)
    }
}

/// Rendered fragments returned by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    pub html: String,
    pub head: String,
    pub css: Option<String>,
}

impl RenderResult {
    /// Result carrying only body HTML.
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    /// Head content with any CSS appended as a `<style>` element.
    pub fn head_with_css(&self) -> String {
        match self.css.as_deref() {
            Some(css) if !css.is_empty() => format!("{}<style>{}</style>", self.head, css),
            _ => self.head.clone(),
        }
    }
}

/// Parse an accumulated request body into a payload.
///
/// An empty (or whitespace-only) body is an empty object. Anything else must
/// be a JSON document; any JSON value is accepted as-is.
pub fn parse_payload(body: &[u8]) -> Result<Value, RenderError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body).map_err(RenderError::InvalidPayload)
}
