//! CMS access: delivery/preview API client and the content-source seam

pub mod client;
pub mod stitch;

pub use client::CmsClient;

use async_trait::async_trait;
use egoweb_common::model::{Page, SiteSettings};
use egoweb_common::Result;
use serde_json::Value;

/// Read access to the content store.
///
/// The production implementation is [`CmsClient`]; tests substitute an
/// in-memory fixture so the resolver and page pipeline run without network.
/// `preview` selects the draft-content credential mode.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the page with the given slug, expanded to the configured
    /// inclusion depth, with references stitched in. `Ok(None)` when no
    /// published page carries the slug.
    async fn page_by_slug(&self, slug: &str, preview: bool) -> Result<Option<Page>>;

    /// Fetch one entry by id with an explicit inclusion depth, stitched.
    /// Used by the content graph resolver for references the root query's
    /// depth did not reach.
    async fn entry_by_id(&self, id: &str, include: u8, preview: bool) -> Result<Value>;

    /// Fetch the site-settings singleton, if one is published
    async fn site_settings(&self, preview: bool) -> Result<Option<SiteSettings>>;
}
