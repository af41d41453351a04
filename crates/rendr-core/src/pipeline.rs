//! Request to page.
//!
//! A [`Pipeline`] ties the pieces together for one request: pick the layout,
//! render through the backend against a single snapshot, then compose.

use crate::backend::RenderBackend;
use crate::bundle::BundleSnapshot;
use crate::compose::{compose, AssetBase, Markers};
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::support::SupportFiles;
use serde_json::Value;
use std::sync::Arc;

/// A parsed render request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// URL path, not percent-decoded
    pub pathname: String,
    /// Value of the backend's selector query parameter
    pub selector: Option<String>,
    /// JSON body, `{}` when absent
    pub payload: Value,
}

impl PageRequest {
    pub fn new(pathname: impl Into<String>, selector: Option<String>, payload: Value) -> Self {
        Self {
            pathname: pathname.into(),
            selector,
            payload,
        }
    }
}

/// Everything needed to turn a [`PageRequest`] into HTML.
#[derive(Clone)]
pub struct Pipeline {
    backend: Arc<dyn RenderBackend>,
    layouts: Arc<SupportFiles>,
    markers: Markers,
    assets: AssetBase,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn RenderBackend>, layouts: SupportFiles, assets: AssetBase) -> Self {
        Self {
            backend,
            layouts: Arc::new(layouts),
            markers: Markers::default(),
            assets,
        }
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn layouts(&self) -> &SupportFiles {
        &self.layouts
    }

    pub fn assets(&self) -> &AssetBase {
        &self.assets
    }

    /// Query parameter that selects the layout for this backend.
    pub fn selector_param(&self) -> &'static str {
        self.backend.selector_param()
    }

    /// Pick the layout for a request.
    ///
    /// `Ok(None)` means render without a layout.
    pub fn resolve_layout(&self, selector: Option<&str>) -> Result<Option<&str>, RenderError> {
        match selector {
            Some(name) => self
                .layouts
                .resolve(Some(name))
                .map(Some)
                .ok_or_else(|| RenderError::LayoutNotFound(name.to_string())),
            None if self.backend.requires_layout() => Err(RenderError::LayoutNotRequested(
                self.backend.selector_param(),
            )),
            None => Ok(None),
        }
    }

    /// Render one page against `snapshot`.
    pub async fn render_page(
        &self,
        request: &PageRequest,
        snapshot: &BundleSnapshot,
    ) -> Result<String, RenderError> {
        let layout = self.resolve_layout(request.selector.as_deref())?;
        let context = RenderContext::new(request.pathname.clone(), request.payload.clone());

        let mut result = self.backend.render(&context, snapshot).await?;

        let Some(layout) = layout else {
            return Ok(result.html);
        };

        let head_tags = self.backend.head_tags(snapshot, &self.assets);
        result.head.insert_str(0, &head_tags);
        let client = self.backend.client_script(&context, snapshot, &self.assets);
        Ok(compose(layout, &result, &client, &self.markers))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.backend.name())
            .field("layouts", &self.layouts.len())
            .field("markers", &self.markers)
            .field("assets", &self.assets)
            .finish()
    }
}
