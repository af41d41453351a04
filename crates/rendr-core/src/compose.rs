//! Layout composition.
//!
//! Splices rendered fragments and the client bootstrap snippet into a layout
//! document at three literal marker comments.

use crate::context::RenderResult;
use serde_json::Value;

/// Route of the development reload client script.
pub const RELOAD_SCRIPT_ROUTE: &str = "/__rendr_reload__.js";

/// Route of the development reload event stream.
pub const RELOAD_EVENTS_ROUTE: &str = "/__rendr_events__";

/// Marker tokens a layout uses to mark its head, body and client regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub head: String,
    pub body: String,
    pub client: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            head: "<!--HEAD-->".to_string(),
            body: "<!--BODY-->".to_string(),
            client: "<!--CLIENT-->".to_string(),
        }
    }
}

/// Where the browser loads client bundles from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetBase {
    /// Served live by this process; includes the reload client.
    Dev { origin: String, public_path: String },
    /// Pre-built files served by the calling web server.
    Static { public_path: String },
}

impl AssetBase {
    /// Public URL of a client file.
    pub fn url(&self, file: &str) -> String {
        let file = file.trim_start_matches('/');
        match self {
            // A full URL points elsewhere and is used as is
            AssetBase::Dev { public_path, .. } if public_path.contains("://") => {
                join_public_path(public_path, file)
            }
            AssetBase::Dev {
                origin,
                public_path,
            } => format!(
                "{}{}",
                origin.trim_end_matches('/'),
                join_public_path(public_path, file)
            ),
            AssetBase::Static { public_path } => join_public_path(public_path, file),
        }
    }

    /// Script tag for the reload client, development only.
    pub fn reload_tag(&self) -> Option<String> {
        match self {
            AssetBase::Dev { origin, .. } => Some(format!(
                r#"<script src="{}{}"></script>"#,
                origin.trim_end_matches('/'),
                RELOAD_SCRIPT_ROUTE
            )),
            AssetBase::Static { .. } => None,
        }
    }

    /// URL prefix client files live under.
    pub fn public_path(&self) -> &str {
        match self {
            AssetBase::Dev { public_path, .. } | AssetBase::Static { public_path } => public_path,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, AssetBase::Dev { .. })
    }
}

fn join_public_path(public_path: &str, file: &str) -> String {
    let base = public_path.trim_end_matches('/');
    let base = if base.starts_with('/') || base.contains("://") {
        base.to_string()
    } else {
        format!("/{}", base)
    };
    format!("{}/{}", base.trim_end_matches('/'), file)
}

/// Compose the final page.
///
/// Each marker's first occurrence in `layout` is replaced exactly once.
/// Positions are taken from the original layout, so content inserted for one
/// marker is never scanned for another. Missing markers are skipped.
pub fn compose(layout: &str, result: &RenderResult, client: &str, markers: &Markers) -> String {
    let head = result.head_with_css();

    let mut splices: Vec<(usize, usize, &str)> = Vec::with_capacity(3);
    for (marker, content) in [
        (markers.head.as_str(), head.as_str()),
        (markers.body.as_str(), result.html.as_str()),
        (markers.client.as_str(), client),
    ] {
        match layout.find(marker) {
            Some(pos) => splices.push((pos, marker.len(), content)),
            None => tracing::debug!("Layout has no {} marker, skipping", marker),
        }
    }
    splices.sort_by_key(|(pos, _, _)| *pos);

    let extra: usize = splices.iter().map(|(_, _, content)| content.len()).sum();
    let mut output = String::with_capacity(layout.len() + extra);
    let mut cursor = 0;
    for (pos, len, content) in splices {
        // Overlapping markers: the earlier one wins
        if pos < cursor {
            continue;
        }
        output.push_str(&layout[cursor..pos]);
        output.push_str(content);
        cursor = pos + len;
    }
    output.push_str(&layout[cursor..]);
    output
}

/// Serialize a value for embedding inside a `<script>` element.
///
/// Escapes `<`, `>`, `&` and the JS line separators so the payload cannot
/// close the script element or break the surrounding source.
pub fn script_json(value: &Value) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
