//! Draft (preview) mode toggle endpoints
//!
//! `GET /api/draft?secret=...&slug=...` enables the draft cookie and
//! redirects to the target page; `GET /api/disable-draft` clears it. The
//! secret is a shared value from configuration; when none is configured the
//! endpoint behaves as if it did not exist.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;

/// Marks the session as draft-mode; HTTP-only, session lifetime
pub const DRAFT_COOKIE: &str = "ego_draft";

#[derive(Debug, Deserialize)]
pub struct DraftQuery {
    secret: String,
    #[serde(default)]
    slug: Option<String>,
}

/// GET /api/draft
pub async fn enable_draft(
    State(state): State<AppState>,
    Query(query): Query<DraftQuery>,
    jar: CookieJar,
) -> Response {
    let Some(expected) = state.config.preview.secret.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if query.secret != expected {
        warn!("draft mode request with invalid secret");
        return (StatusCode::UNAUTHORIZED, "Invalid secret").into_response();
    }
    if state.config.cms.preview_token.is_none() {
        warn!("draft mode enabled without a preview token; draft content will not load");
    }

    let jar = jar.add(
        Cookie::build((DRAFT_COOKIE, "1"))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );

    let target = match query.slug.as_deref() {
        None | Some("") | Some("home") => "/".to_string(),
        Some(slug) => format!("/p/{}", slug),
    };
    info!(target, "draft mode enabled");
    (jar, Redirect::to(&target)).into_response()
}

/// GET /api/disable-draft
pub async fn disable_draft(jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(DRAFT_COOKIE).path("/").build());
    info!("draft mode disabled");
    (jar, Redirect::to("/")).into_response()
}
