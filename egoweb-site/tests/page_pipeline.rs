//! Integration tests for the page rendering pipeline
//!
//! Drives the real router against an in-memory content source, so the full
//! path (route -> decision middleware -> graph resolution -> selection ->
//! render) runs without any network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

use egoweb_common::config::SiteConfig;
use egoweb_common::decision::DecisionMap;
use egoweb_common::model::{Page, SiteSettings};
use egoweb_common::{Error, Result};
use egoweb_site::cms::ContentSource;
use egoweb_site::personalization::{DecisionOutcome, DecisionSource, VisitorContext};
use egoweb_site::{build_router, AppState};

/// In-memory content source seeded with raw page JSON
struct FixtureSource {
    pages: HashMap<String, Value>,
}

impl FixtureSource {
    fn new(pages: Vec<Value>) -> Self {
        let pages = pages
            .into_iter()
            .filter_map(|v| {
                v["fields"]["slug"]
                    .as_str()
                    .map(|slug| (slug.to_string(), v.clone()))
            })
            .collect();
        Self { pages }
    }
}

#[async_trait]
impl ContentSource for FixtureSource {
    async fn page_by_slug(&self, slug: &str, _preview: bool) -> Result<Option<Page>> {
        Ok(self.pages.get(slug).and_then(Page::from_value))
    }

    async fn entry_by_id(&self, id: &str, _include: u8, _preview: bool) -> Result<Value> {
        Err(Error::NotFound(format!("entry {}", id)))
    }

    async fn site_settings(&self, _preview: bool) -> Result<Option<SiteSettings>> {
        Ok(Some(SiteSettings {
            site_name: Some("Ego Pharmaceuticals".to_string()),
            logo: None,
        }))
    }
}

/// Decision source returning a fixed outcome, standing in for the remote
/// service on the edge strategy
struct StaticDecisionSource {
    decisions: DecisionMap,
}

#[async_trait]
impl DecisionSource for StaticDecisionSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn decide(&self, _visitor: &VisitorContext) -> DecisionOutcome {
        DecisionOutcome {
            profile: None,
            decisions: self.decisions.clone(),
        }
    }
}

fn test_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.cms.space_id = "test-space".to_string();
    config.cms.delivery_token = "token".to_string();
    config.preview.secret = Some("knock-knock".to_string());
    config
}

fn home_page() -> Value {
    json!({
        "sys": { "id": "p1", "type": "Entry" },
        "fields": {
            "title": "Home",
            "slug": "home",
            "modules": [{
                "sys": {
                    "id": "m1",
                    "type": "Entry",
                    "contentType": { "sys": { "id": "hero" } }
                },
                "fields": {
                    "title": "Baseline hero",
                    "nt_experiences": [{
                        "sys": { "id": "exp-1", "type": "Entry" },
                        "fields": {
                            "nt_name": "Returning visitors hero",
                            "nt_type": "nt_personalization",
                            "nt_variants": [{
                                "sys": {
                                    "id": "v1",
                                    "type": "Entry",
                                    "contentType": { "sys": { "id": "hero" } }
                                },
                                "fields": { "title": "Variant hero" }
                            }]
                        }
                    }]
                }
            }]
        }
    })
}

fn setup_app(decisions: Option<Arc<dyn DecisionSource>>) -> axum::Router {
    let state = AppState::new(
        test_config(),
        Arc::new(FixtureSource::new(vec![home_page()])),
        decisions,
    );
    build_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap()
}

fn set_cookies<B>(response: &axum::http::Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

async fn body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8")
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = setup_app(None);
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "egoweb-site");
}

#[tokio::test]
async fn home_renders_baseline_without_personalization() {
    let app = setup_app(None);
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    assert!(body.contains("Baseline hero"));
    assert!(!body.contains("Variant hero"));
    // Chrome comes along
    assert!(body.contains("Ego Pharmaceuticals"));
}

#[tokio::test]
async fn edge_decisions_swap_in_the_variant() {
    let mut decisions = DecisionMap::new();
    decisions.insert("exp-1", 1);
    let app = setup_app(Some(Arc::new(StaticDecisionSource { decisions })));

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    assert!(body.contains("Variant hero"));
    assert!(!body.contains("Baseline hero"));
}

#[tokio::test]
async fn out_of_range_decision_renders_baseline() {
    let mut decisions = DecisionMap::new();
    decisions.insert("exp-1", 7);
    let app = setup_app(Some(Arc::new(StaticDecisionSource { decisions })));

    let response = app.oneshot(get("/")).await.unwrap();
    let body = body_string(response.into_body()).await;
    assert!(body.contains("Baseline hero"));
}

#[tokio::test]
async fn empty_decisions_render_identically_across_requests() {
    // Parity invariant: the baseline markup must be byte-stable so server
    // output and client re-render cannot diverge
    let app = setup_app(Some(Arc::new(StaticDecisionSource {
        decisions: DecisionMap::new(),
    })));

    let first = body_string(
        app.clone().oneshot(get("/")).await.unwrap().into_body(),
    )
    .await;
    let second = body_string(app.oneshot(get("/")).await.unwrap().into_body()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn middleware_sets_visitor_and_visit_cookies() {
    let app = setup_app(Some(Arc::new(StaticDecisionSource {
        decisions: DecisionMap::new(),
    })));

    let response = app.oneshot(get("/")).await.unwrap();
    let cookies = set_cookies(&response);

    assert!(cookies.iter().any(|c| c.starts_with("ego_vid=")));
    assert!(cookies.iter().any(|c| c.starts_with("ego_visits=1")));
    assert!(cookies.iter().any(|c| c.starts_with("ego_session=")));
}

#[tokio::test]
async fn decisions_are_snapshotted_to_a_cookie() {
    let mut decisions = DecisionMap::new();
    decisions.insert("exp-1", 1);
    let app = setup_app(Some(Arc::new(StaticDecisionSource { decisions })));

    let response = app.oneshot(get("/")).await.unwrap();
    let cookies = set_cookies(&response);
    let snapshot = cookies
        .iter()
        .find(|c| c.starts_with("ego_experiences="))
        .expect("Decision snapshot cookie should be set");
    assert!(snapshot.contains("exp-1"));
}

#[tokio::test]
async fn empty_evaluation_clears_a_stale_decision_cookie() {
    // The visitor carries a snapshot from an earlier request, but this
    // evaluation comes back empty (service failure, timeout). The server
    // renders baseline, so the old snapshot must not outlive it.
    let app = setup_app(Some(Arc::new(StaticDecisionSource {
        decisions: DecisionMap::new(),
    })));

    let response = app
        .oneshot(get_with_cookies(
            "/",
            "ego_vid=abc; ego_experiences={\"exp-1\":1}",
        ))
        .await
        .unwrap();
    let cookies = set_cookies(&response);
    let snapshot = cookies
        .iter()
        .find(|c| c.starts_with("ego_experiences="))
        .expect("Stale decision cookie should be superseded");
    assert!(snapshot.contains("Max-Age=0"));
}

#[tokio::test]
async fn visit_count_holds_steady_within_a_session() {
    let app = setup_app(Some(Arc::new(StaticDecisionSource {
        decisions: DecisionMap::new(),
    })));

    // Second page view of the same visit: the session marker is present
    let response = app
        .oneshot(get_with_cookies(
            "/",
            "ego_vid=abc; ego_visits=1; ego_session=1",
        ))
        .await
        .unwrap();
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("ego_visits=1;")));
}

#[tokio::test]
async fn new_session_advances_the_visit_count() {
    let app = setup_app(Some(Arc::new(StaticDecisionSource {
        decisions: DecisionMap::new(),
    })));

    // Same durable cookies, but the session marker has expired
    let response = app
        .oneshot(get_with_cookies("/", "ego_vid=abc; ego_visits=1"))
        .await
        .unwrap();
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("ego_visits=2")));
    assert!(cookies.iter().any(|c| c.starts_with("ego_session=")));
}

#[tokio::test]
async fn health_route_bypasses_decision_middleware() {
    let app = setup_app(Some(Arc::new(StaticDecisionSource {
        decisions: DecisionMap::new(),
    })));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn unknown_slug_is_a_styled_not_found_page() {
    let app = setup_app(None);
    let response = app.oneshot(get("/p/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_string(response.into_body()).await;
    assert!(body.contains("Page not found"));
}

#[tokio::test]
async fn draft_endpoint_rejects_bad_secret() {
    let app = setup_app(None);
    let response = app
        .oneshot(get("/api/draft?secret=wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn draft_endpoint_sets_cookie_and_redirects() {
    let app = setup_app(None);
    let response = app
        .oneshot(get("/api/draft?secret=knock-knock&slug=about"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/p/about"
    );

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("ego_draft=1"));
}

#[tokio::test]
async fn disable_draft_clears_cookie() {
    let app = setup_app(None);
    let response = app.oneshot(get("/api/disable-draft")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("ego_draft="));
    assert!(cookie.contains("Max-Age=0"));
}
