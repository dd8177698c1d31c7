//! Experience extraction and variant selection
//!
//! Both functions are pure: all fetching happens in the resolver and all
//! decision I/O in the decision source, so this is the testable core of the
//! personalization pipeline.

use egoweb_common::decision::DecisionMap;
use egoweb_common::model::{Experience, ModuleContent, ModuleEntry, Reference};

/// Valid experiences attached to a module, in the module's field order.
///
/// Unresolved stubs and structurally invalid experiences are dropped
/// silently; a module with no usable experiences simply has no
/// personalization. The order has no selection weight of its own but makes
/// matching deterministic.
pub fn extract_experiences(module: &ModuleEntry) -> Vec<&Experience> {
    module
        .experiences
        .iter()
        .filter_map(Reference::resolved)
        .filter(|experience| experience.is_valid())
        .collect()
}

/// The content this module should render for the given decisions: the first
/// experience (in extractor order) with a usable decision and a resolved
/// variant wins, otherwise baseline.
///
/// A decision's `variant_index` of 0 is an explicit baseline choice; index
/// `i >= 1` selects `variants[i - 1]`. Out-of-range indexes and unresolved
/// variants fall through to the next experience rather than erroring.
///
/// First-match is the whole policy: no priority ordering between experiences
/// is defined upstream and none is invented here.
pub fn select_content<'a>(
    module: &'a ModuleEntry,
    decisions: &DecisionMap,
) -> &'a ModuleContent {
    for experience in extract_experiences(module) {
        let Some(index) = decisions.variant_index(&experience.id) else {
            continue;
        };
        if index == 0 {
            continue;
        }
        let Some(variant) = experience.variants.get(index - 1) else {
            continue;
        };
        if let Some(entry) = variant.resolved() {
            return &entry.content;
        }
    }
    &module.content
}
