//! egoweb-site library - personalized CMS page service
//!
//! Server-renders marketing pages assembled from CMS entries, with an
//! experiment layer that can swap page sections for audience-targeted
//! variant content. The pipeline per request: fetch page -> resolve content
//! graph -> extract experiences -> select variant per decisions -> render.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use egoweb_common::config::SiteConfig;

pub mod api;
pub mod cms;
pub mod experience;
pub mod personalization;
pub mod render;
pub mod resolver;

use cms::ContentSource;
use personalization::DecisionSource;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    /// Content store behind a seam so tests can run without network
    pub content: Arc<dyn ContentSource>,
    /// Configured decision source; `None` disables personalization entirely
    pub decisions: Option<Arc<dyn DecisionSource>>,
}

impl AppState {
    pub fn new(
        config: SiteConfig,
        content: Arc<dyn ContentSource>,
        decisions: Option<Arc<dyn DecisionSource>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            content,
            decisions,
        }
    }
}

/// Build application router.
///
/// The decision middleware wraps only page routes: health and draft
/// endpoints never trigger a personalization call.
pub fn build_router(state: AppState) -> Router {
    let mut pages = Router::new()
        .route("/", get(api::serve_home))
        .route("/p/:slug", get(api::serve_page));

    if state.decisions.is_some() {
        pages = pages.layer(middleware::from_fn_with_state(
            state.clone(),
            personalization::middleware::decision_middleware,
        ));
    }

    Router::new()
        .merge(pages)
        .merge(api::health_routes())
        .route("/api/draft", get(api::enable_draft))
        .route("/api/disable-draft", get(api::disable_draft))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
