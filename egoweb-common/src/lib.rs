//! # egoweb Common Library
//!
//! Shared code for the egoweb site service including:
//! - CMS entry graph model (pages, modules, experiences, variants)
//! - Decision and profile types for personalization
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod decision;
pub mod error;
pub mod model;

pub use error::{Error, Result};
