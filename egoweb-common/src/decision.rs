//! Decision and profile types
//!
//! A [`Decision`] is the remote personalization service's verdict for one
//! experience: which variant index the current visitor should see. Decisions
//! are transient per-request artifacts, handed across the middleware/render
//! boundary in short-lived cookies and never persisted server-side.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-experience variant selection for the current visitor.
///
/// `variant_index` 0 means baseline; index `i >= 1` selects the experience's
/// variant at list position `i - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub experience_id: String,
    pub variant_index: usize,
}

/// Mapping from experience identifier to selected variant index.
///
/// An empty map is the universal fallback: every module renders baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMap(HashMap<String, usize>);

impl DecisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected variant index for an experience, if the service produced one
    pub fn variant_index(&self, experience_id: &str) -> Option<usize> {
        self.0.get(experience_id).copied()
    }

    pub fn insert(&mut self, experience_id: impl Into<String>, variant_index: usize) {
        self.0.insert(experience_id.into(), variant_index);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Decision> for DecisionMap {
    fn from_iter<I: IntoIterator<Item = Decision>>(iter: I) -> Self {
        let mut map = DecisionMap::new();
        for decision in iter {
            map.insert(decision.experience_id, decision.variant_index);
        }
        map
    }
}

/// Session counters inside a profile snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub is_returning_visitor: bool,
    pub count: u32,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            is_returning_visitor: false,
            count: 1,
        }
    }
}

/// Read-only snapshot of the remote service's visitor model.
///
/// Owned by the remote service; this copy lives for one request plus the
/// few minutes its cookie survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub audiences: Vec<String>,
    #[serde(default)]
    pub session: SessionInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_map_collects_from_decisions() {
        let map: DecisionMap = vec![
            Decision {
                experience_id: "exp-1".to_string(),
                variant_index: 1,
            },
            Decision {
                experience_id: "exp-2".to_string(),
                variant_index: 0,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.variant_index("exp-1"), Some(1));
        assert_eq!(map.variant_index("exp-2"), Some(0));
        assert_eq!(map.variant_index("exp-3"), None);
    }

    #[test]
    fn decision_round_trips_camel_case() {
        let json = r#"{"experienceId":"exp-1","variantIndex":2}"#;
        let decision: Decision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.variant_index, 2);
        assert_eq!(serde_json::to_string(&decision).unwrap(), json);
    }

    #[test]
    fn profile_defaults_missing_sections() {
        let profile: Profile = serde_json::from_str(r#"{"id":"p-1"}"#).unwrap();
        assert!(profile.audiences.is_empty());
        assert_eq!(profile.session.count, 1);
        assert!(!profile.session.is_returning_visitor);
    }
}
