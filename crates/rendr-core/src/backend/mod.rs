//! Render backends.
//!
//! Both supported frameworks are driven through the same [`RenderBackend`]
//! contract; the backend decides how to talk to its renderer and how the
//! browser picks the page back up (the client bootstrap snippet).

mod bundle;
mod component;
mod worker;

pub use bundle::BundleBackend;
pub use component::{module_path, ComponentBackend, DEFAULT_MOUNT_SELECTOR};
pub use worker::RenderWorker;

use crate::bundle::BundleSnapshot;
use crate::compose::AssetBase;
use crate::context::{RenderContext, RenderResult};
use crate::error::RenderError;
use async_trait::async_trait;

/// Default key under which the request payload is exposed to components.
pub const DEFAULT_CONTEXT_KEY: &str = "context";

/// A framework server renderer.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Query parameter that selects the layout.
    fn selector_param(&self) -> &'static str;

    /// Whether a request without a layout can still be answered.
    fn requires_layout(&self) -> bool;

    /// Render one request against a snapshot.
    async fn render(
        &self,
        context: &RenderContext,
        snapshot: &BundleSnapshot,
    ) -> Result<RenderResult, RenderError>;

    /// Markup placed ahead of the rendered head, such as stylesheet links.
    fn head_tags(&self, _snapshot: &BundleSnapshot, _assets: &AssetBase) -> String {
        String::new()
    }

    /// Client bootstrap markup inserted at the client marker.
    fn client_script(
        &self,
        context: &RenderContext,
        snapshot: &BundleSnapshot,
        assets: &AssetBase,
    ) -> String;
}
