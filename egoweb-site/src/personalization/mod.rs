//! Decision sources
//!
//! A [`DecisionSource`] answers one question per request: for this visitor,
//! which variant index should each experience use? Two mutually exclusive
//! strategies exist and a deployment picks exactly one in configuration:
//!
//! - **Edge**: middleware calls the remote service before rendering and the
//!   server applies decisions itself; cookies carry the same snapshot to the
//!   client so both sides agree.
//! - **Client**: the server never selects a variant (markup is always
//!   baseline for first-paint parity) and only maintains a local visit-count
//!   heuristic profile for the client runtime to consume.
//!
//! Sources are infallible by contract: any remote failure or timeout
//! degrades to an empty decision map and baseline content. Personalization
//! must never take the page down with it.

pub mod api;
pub mod middleware;

pub use api::{ProfileApiClient, ProfileResponse};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use egoweb_common::config::{DecisionStrategy, PersonalizationConfig};
use egoweb_common::decision::{DecisionMap, Profile, SessionInfo};
use egoweb_common::{Error, Result};

/// Audience assigned by the local heuristic on a visitor's first visit
pub const FIRST_TIME_AUDIENCE: &str = "first-time-visitor";
/// Audience assigned by the local heuristic on later visits
pub const RETURNING_AUDIENCE: &str = "returning-visitor";

/// Transport-state facts about the current visitor, read from cookies
#[derive(Debug, Clone)]
pub struct VisitorContext {
    pub visitor_id: String,
    /// No identity cookie was present on this request
    pub is_new_visitor: bool,
    /// Durable visit counter, including this visit
    pub visit_count: u32,
}

/// What a decision source produced for one request
#[derive(Debug, Clone, Default)]
pub struct DecisionOutcome {
    pub profile: Option<Profile>,
    pub decisions: DecisionMap,
}

/// Strategy seam for obtaining per-experience decisions
#[async_trait]
pub trait DecisionSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve decisions for the visitor. Must not fail: degraded outcomes
    /// are empty, which renders baseline everywhere.
    async fn decide(&self, visitor: &VisitorContext) -> DecisionOutcome;
}

/// Request-time strategy: ask the remote service, bounded by a timeout
pub struct EdgeDecisionSource {
    api: ProfileApiClient,
    timeout: Duration,
}

impl EdgeDecisionSource {
    pub fn new(api: ProfileApiClient, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    async fn fetch_or_create(&self, visitor: &VisitorContext) -> Result<ProfileResponse> {
        if visitor.is_new_visitor {
            return self.api.create_profile().await;
        }
        match self.api.get_profile(&visitor.visitor_id).await {
            // The service forgot the id (expired, wrong environment);
            // start a fresh profile rather than failing the request
            Err(Error::NotFound(_)) => self.api.create_profile().await,
            other => other,
        }
    }
}

#[async_trait]
impl DecisionSource for EdgeDecisionSource {
    fn name(&self) -> &'static str {
        "edge"
    }

    async fn decide(&self, visitor: &VisitorContext) -> DecisionOutcome {
        match tokio::time::timeout(self.timeout, self.fetch_or_create(visitor)).await {
            Ok(Ok(response)) => {
                debug!(
                    visitor_id = %visitor.visitor_id,
                    profile_id = %response.profile.id,
                    decisions = response.decisions.len(),
                    "decisions resolved"
                );
                DecisionOutcome {
                    profile: Some(response.profile),
                    decisions: response.decisions.into_iter().collect(),
                }
            }
            Ok(Err(e)) => {
                warn!(
                    visitor_id = %visitor.visitor_id,
                    error = %e,
                    "personalization service unavailable; rendering baseline"
                );
                DecisionOutcome::default()
            }
            Err(_) => {
                warn!(
                    visitor_id = %visitor.visitor_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "personalization call timed out; rendering baseline"
                );
                DecisionOutcome::default()
            }
        }
    }
}

/// Client strategy: the server's markup stays baseline; the profile is a
/// local visit-count heuristic written for the client runtime
pub struct ClientDelegatedSource;

#[async_trait]
impl DecisionSource for ClientDelegatedSource {
    fn name(&self) -> &'static str {
        "client"
    }

    async fn decide(&self, visitor: &VisitorContext) -> DecisionOutcome {
        let is_returning = visitor.visit_count > 1;
        let audience = if is_returning {
            RETURNING_AUDIENCE
        } else {
            FIRST_TIME_AUDIENCE
        };
        DecisionOutcome {
            profile: Some(Profile {
                id: visitor.visitor_id.clone(),
                audiences: vec![audience.to_string()],
                session: SessionInfo {
                    is_returning_visitor: is_returning,
                    count: visitor.visit_count,
                },
            }),
            // Selection belongs to the client runtime under this strategy
            decisions: DecisionMap::new(),
        }
    }
}

/// Build the configured decision source, or `None` when personalization is
/// switched off entirely
pub fn build_decision_source(
    config: &PersonalizationConfig,
) -> Result<Option<Arc<dyn DecisionSource>>> {
    if !config.enabled {
        return Ok(None);
    }
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.strategy {
        DecisionStrategy::Edge => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                Error::Config("edge personalization requires an API key".to_string())
            })?;
            let api = ProfileApiClient::new(api_key, config.environment.clone(), timeout)?;
            Ok(Some(Arc::new(EdgeDecisionSource::new(api, timeout))))
        }
        DecisionStrategy::Client => Ok(Some(Arc::new(ClientDelegatedSource))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visitor(count: u32) -> VisitorContext {
        VisitorContext {
            visitor_id: "vid-1".to_string(),
            is_new_visitor: count <= 1,
            visit_count: count,
        }
    }

    #[tokio::test]
    async fn client_strategy_never_produces_decisions() {
        let outcome = ClientDelegatedSource.decide(&visitor(5)).await;
        assert!(outcome.decisions.is_empty());
    }

    #[tokio::test]
    async fn client_heuristic_classifies_first_and_returning_visits() {
        let first = ClientDelegatedSource.decide(&visitor(1)).await;
        let profile = first.profile.unwrap();
        assert_eq!(profile.audiences, vec![FIRST_TIME_AUDIENCE.to_string()]);
        assert!(!profile.session.is_returning_visitor);

        let later = ClientDelegatedSource.decide(&visitor(3)).await;
        let profile = later.profile.unwrap();
        assert_eq!(profile.audiences, vec![RETURNING_AUDIENCE.to_string()]);
        assert!(profile.session.is_returning_visitor);
        assert_eq!(profile.session.count, 3);
    }

    #[tokio::test]
    async fn edge_strategy_degrades_to_empty_on_unreachable_service() {
        // Nothing listens on this port; the call fails fast and the source
        // must swallow it
        let api = ProfileApiClient::new(
            "org-key".to_string(),
            "main".to_string(),
            Duration::from_millis(250),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:1/v2");

        let source = EdgeDecisionSource::new(api, Duration::from_millis(500));
        let outcome = source.decide(&visitor(2)).await;
        assert!(outcome.decisions.is_empty());
        assert!(outcome.profile.is_none());
    }

    #[test]
    fn disabled_config_builds_no_source() {
        let config = PersonalizationConfig::default();
        assert!(build_decision_source(&config).unwrap().is_none());
    }

    #[test]
    fn edge_without_api_key_is_a_config_error() {
        let config = PersonalizationConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(
            build_decision_source(&config),
            Err(Error::Config(_))
        ));
    }
}
