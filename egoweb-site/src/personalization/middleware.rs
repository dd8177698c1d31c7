//! Request-time decision middleware
//!
//! Runs before page handlers when personalization is enabled. Establishes
//! the visitor identity, asks the configured decision source once, injects
//! the outcome into request extensions for the render step, and writes the
//! cookie snapshots the client runtime reads without a second round trip.
//!
//! Cookie lifetimes: identity and visit counter are long-lived (~1 year);
//! decision and profile snapshots are short-lived (~5 minutes) and are
//! superseded on the next evaluation — including a degraded one, which
//! clears them so the client cannot replay variants the server stopped
//! rendering. The visit counter advances once per browser session, tracked
//! by a session-scoped marker cookie.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;
use tracing::warn;
use uuid::Uuid;

use egoweb_common::decision::{DecisionMap, Profile};

use super::{DecisionOutcome, VisitorContext};
use crate::AppState;

/// Stable visitor identity (readable by the client runtime)
pub const VISITOR_ID_COOKIE: &str = "ego_vid";
/// Durable visit counter backing the local heuristic
pub const VISIT_COUNT_COOKIE: &str = "ego_visits";
/// Session marker; expires with the browser session, so its absence marks
/// the start of a new visit
pub const SESSION_COOKIE: &str = "ego_session";
/// Per-experience variant index snapshot
pub const DECISIONS_COOKIE: &str = "ego_experiences";
/// Profile snapshot (audience memberships, session counters)
pub const PROFILE_COOKIE: &str = "ego_profile";

const YEAR: CookieDuration = CookieDuration::days(365);
const SNAPSHOT_TTL: CookieDuration = CookieDuration::minutes(5);

/// Decision state handed from the middleware to the page handler
#[derive(Debug, Clone, Default)]
pub struct RequestDecisions {
    pub decisions: DecisionMap,
    pub profile: Option<Profile>,
}

/// Resolve decisions for the request and carry them to both the handler
/// (extensions) and the client (cookies)
pub async fn decision_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing_id = jar.get(VISITOR_ID_COOKIE).map(|c| c.value().to_string());
    let is_new_visitor = existing_id.is_none();
    let visitor_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let stored_visits = jar
        .get(VISIT_COUNT_COOKIE)
        .and_then(|c| c.value().parse::<u32>().ok())
        .unwrap_or(0);
    // Count visits, not page views: the counter only advances when no
    // session marker accompanied the request
    let visit_count = if jar.get(SESSION_COOKIE).is_some() {
        stored_visits.max(1)
    } else {
        stored_visits.saturating_add(1)
    };

    let visitor = VisitorContext {
        visitor_id: visitor_id.clone(),
        is_new_visitor,
        visit_count,
    };

    let outcome = match &state.decisions {
        Some(source) => source.decide(&visitor).await,
        None => DecisionOutcome::default(),
    };

    // The service may mint its own id on the create path; from then on that
    // id is the visitor identity
    let canonical_id = outcome
        .profile
        .as_ref()
        .map(|p| p.id.clone())
        .unwrap_or(visitor_id);

    request.extensions_mut().insert(RequestDecisions {
        decisions: outcome.decisions.clone(),
        profile: outcome.profile.clone(),
    });

    let response = next.run(request).await;

    let mut jar = jar
        .add(durable_cookie(VISITOR_ID_COOKIE, canonical_id))
        .add(durable_cookie(VISIT_COUNT_COOKIE, visit_count.to_string()))
        .add(session_marker());

    // Every evaluation supersedes the previous snapshot. An empty outcome
    // clears the cookie; otherwise a client replaying the old snapshot would
    // apply variants the server no longer rendered.
    if outcome.decisions.is_empty() {
        jar = jar.remove(stale_snapshot(DECISIONS_COOKIE));
    } else {
        match serde_json::to_string(&outcome.decisions) {
            Ok(json) => jar = jar.add(snapshot_cookie(DECISIONS_COOKIE, json)),
            Err(e) => {
                warn!(error = %e, "decision snapshot not serializable; clearing cookie");
                jar = jar.remove(stale_snapshot(DECISIONS_COOKIE));
            }
        }
    }
    match &outcome.profile {
        Some(profile) => match serde_json::to_string(profile) {
            Ok(json) => jar = jar.add(snapshot_cookie(PROFILE_COOKIE, json)),
            Err(e) => {
                warn!(error = %e, "profile snapshot not serializable; clearing cookie");
                jar = jar.remove(stale_snapshot(PROFILE_COOKIE));
            }
        },
        None => jar = jar.remove(stale_snapshot(PROFILE_COOKIE)),
    }

    (jar, response).into_response()
}

fn durable_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(false)
        .max_age(YEAR)
        .build()
}

fn snapshot_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(false)
        .max_age(SNAPSHOT_TTL)
        .build()
}

// No max_age: the browser drops it when the session ends
fn session_marker() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "1"))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .build()
}

// Removal must carry the same path as the cookie it supersedes
fn stale_snapshot(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durable_and_snapshot_lifetimes_differ() {
        let durable = durable_cookie(VISITOR_ID_COOKIE, "abc".to_string());
        let snapshot = snapshot_cookie(DECISIONS_COOKIE, "{}".to_string());
        assert_eq!(durable.max_age(), Some(YEAR));
        assert_eq!(snapshot.max_age(), Some(SNAPSHOT_TTL));
        // Both must be readable by the client runtime
        assert_eq!(durable.http_only(), Some(false));
        assert_eq!(snapshot.http_only(), Some(false));
    }

    #[test]
    fn session_marker_expires_with_the_browser_session() {
        let marker = session_marker();
        assert_eq!(marker.max_age(), None);
        assert_eq!(marker.http_only(), Some(true));
    }
}
