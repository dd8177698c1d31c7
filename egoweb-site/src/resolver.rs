//! Content graph resolver
//!
//! The root page query expands references breadth-first up to the configured
//! inclusion depth, so experience structures nested deep inside modules
//! commonly arrive as link stubs. This resolver walks each module and issues
//! on-demand fetches for whatever is still unresolved: experience entries
//! first (with enough depth to pull in their audience and variants), then
//! any audience or variant references that are still stubs afterwards.
//!
//! All fetches at one level fan out concurrently and are joined before the
//! next level runs; nothing depends on sibling results and resolution only
//! fills in missing data, so the materialized tree is order-independent.
//!
//! A failed fetch leaves its reference as a stub and logs a warning. The
//! experience extractor later drops anything unusable, so a partially
//! resolved page still renders with baseline content.

use futures::future::join_all;
use tracing::warn;

use egoweb_common::model::{Experience, ModuleEntry, Page, Reference};

use crate::cms::ContentSource;

/// Depth for on-demand experience fetches: experience -> variant -> variant
/// assets, and experience -> audience
const EXPERIENCE_INCLUDE_DEPTH: u8 = 3;
/// Audiences are flat rule entries
const AUDIENCE_INCLUDE_DEPTH: u8 = 1;
/// Variants own asset references one hop down
const VARIANT_INCLUDE_DEPTH: u8 = 2;

/// Fills in unresolved references below a fetched page
pub struct ContentGraphResolver<'a> {
    source: &'a dyn ContentSource,
    preview: bool,
}

impl<'a> ContentGraphResolver<'a> {
    pub fn new(source: &'a dyn ContentSource, preview: bool) -> Self {
        Self { source, preview }
    }

    /// Resolve experience structures under every module of the page.
    /// Already-resolved references are left untouched and cost no fetches.
    pub async fn resolve_page(&self, page: &mut Page) {
        let work = page
            .modules
            .iter_mut()
            .filter_map(Reference::resolved_mut)
            .map(|module| self.resolve_module(module));
        join_all(work).await;
    }

    /// Resolve one module's experience list, then the audience and variant
    /// references inside each resolved experience
    pub async fn resolve_module(&self, module: &mut ModuleEntry) {
        join_all(
            module
                .experiences
                .iter_mut()
                .map(|reference| self.resolve_experience(reference)),
        )
        .await;

        join_all(
            module
                .experiences
                .iter_mut()
                .filter_map(Reference::resolved_mut)
                .map(|experience| self.resolve_experience_children(experience)),
        )
        .await;
    }

    async fn resolve_experience(&self, reference: &mut Reference<Experience>) {
        let Some(id) = reference.link_id().map(str::to_string) else {
            return;
        };
        match self
            .source
            .entry_by_id(&id, EXPERIENCE_INCLUDE_DEPTH, self.preview)
            .await
        {
            Ok(value) => match Experience::from_value(&value) {
                Some(experience) => *reference = Reference::Resolved(experience),
                None => warn!(
                    experience_id = %id,
                    "fetched experience entry is malformed; leaving stub"
                ),
            },
            Err(e) => warn!(
                experience_id = %id,
                error = %e,
                "experience fetch failed; module degrades to baseline"
            ),
        }
    }

    async fn resolve_experience_children(&self, experience: &mut Experience) {
        let audience = async {
            if let Some(reference) = experience.audience.as_mut() {
                if let Some(id) = reference.link_id().map(str::to_string) {
                    match self
                        .source
                        .entry_by_id(&id, AUDIENCE_INCLUDE_DEPTH, self.preview)
                        .await
                    {
                        Ok(value) => {
                            match egoweb_common::model::Audience::from_value(&value) {
                                Some(audience) => {
                                    *reference = Reference::Resolved(audience)
                                }
                                None => warn!(
                                    audience_id = %id,
                                    "fetched audience entry is malformed; leaving stub"
                                ),
                            }
                        }
                        Err(e) => warn!(
                            audience_id = %id,
                            error = %e,
                            "audience fetch failed; leaving stub"
                        ),
                    }
                }
            }
        };

        let variants = join_all(
            experience
                .variants
                .iter_mut()
                .map(|reference| self.resolve_variant(reference)),
        );

        // Disjoint borrows of the experience; run both sides concurrently
        futures::join!(audience, variants);
    }

    async fn resolve_variant(&self, reference: &mut Reference<ModuleEntry>) {
        let Some(id) = reference.link_id().map(str::to_string) else {
            return;
        };
        match self
            .source
            .entry_by_id(&id, VARIANT_INCLUDE_DEPTH, self.preview)
            .await
        {
            Ok(value) => match ModuleEntry::from_value(&value) {
                Some(variant) => *reference = Reference::Resolved(variant),
                None => warn!(
                    variant_id = %id,
                    "fetched variant entry is malformed; leaving stub"
                ),
            },
            Err(e) => warn!(
                variant_id = %id,
                error = %e,
                "variant fetch failed; sibling variants unaffected"
            ),
        }
    }
}
