//! HTTP handlers for the site service

pub mod draft;
pub mod health;
pub mod pages;

pub use draft::{disable_draft, enable_draft, DRAFT_COOKIE};
pub use health::health_routes;
pub use pages::{serve_home, serve_page};
