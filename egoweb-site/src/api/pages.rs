//! Page routes
//!
//! One parameterized route per slug; the root path maps to the `home` slug.
//! Each request runs the full pipeline: fetch page and site settings
//! concurrently, resolve the content graph, select per-module content from
//! the request's decisions, render. Every failure mode degrades rather than
//! erroring: a missing page is a styled 404, an unreachable CMS a styled
//! 502, and absent decisions mean baseline content.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension,
};
use axum_extra::extract::CookieJar;
use tracing::{debug, error, warn};

use egoweb_common::decision::DecisionMap;

use super::draft::DRAFT_COOKIE;
use crate::personalization::middleware::RequestDecisions;
use crate::render;
use crate::resolver::ContentGraphResolver;
use crate::AppState;

/// Slug served at the root path
const HOME_SLUG: &str = "home";

/// GET /
pub async fn serve_home(
    State(state): State<AppState>,
    decisions: Option<Extension<RequestDecisions>>,
    jar: CookieJar,
) -> Response {
    render_slug(&state, HOME_SLUG, decisions, &jar).await
}

/// GET /p/:slug
pub async fn serve_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    decisions: Option<Extension<RequestDecisions>>,
    jar: CookieJar,
) -> Response {
    render_slug(&state, &slug, decisions, &jar).await
}

async fn render_slug(
    state: &AppState,
    slug: &str,
    decisions: Option<Extension<RequestDecisions>>,
    jar: &CookieJar,
) -> Response {
    // Draft mode needs both the cookie and a configured preview credential
    let preview =
        jar.get(DRAFT_COOKIE).is_some() && state.config.cms.preview_token.is_some();

    let (page_result, settings_result) = tokio::join!(
        state.content.page_by_slug(slug, preview),
        state.content.site_settings(preview),
    );

    let mut page = match page_result {
        Ok(Some(page)) => page,
        Ok(None) => {
            debug!(slug, "no page for slug");
            return (
                StatusCode::NOT_FOUND,
                Html(render::render_not_found(slug)),
            )
                .into_response();
        }
        Err(e) => {
            error!(slug, error = %e, "page fetch failed");
            return (
                StatusCode::BAD_GATEWAY,
                Html(render::render_service_error()),
            )
                .into_response();
        }
    };

    // Chrome is optional; a settings fetch failure costs only the logo
    let settings = settings_result.unwrap_or_else(|e| {
        warn!(error = %e, "site settings fetch failed; using defaults");
        None
    });

    ContentGraphResolver::new(state.content.as_ref(), preview)
        .resolve_page(&mut page)
        .await;

    let decision_map = decisions
        .map(|Extension(d)| d.decisions)
        .unwrap_or_else(DecisionMap::new);
    debug!(
        slug,
        modules = page.modules.len(),
        decisions = decision_map.len(),
        preview,
        "rendering page"
    );

    Html(render::render_page(&page, settings.as_ref(), &decision_map)).into_response()
}
