//! HTML rendering
//!
//! Pure template composition: modules dispatch on the content sum type,
//! chrome wraps them, and nothing in here makes a decision about *which*
//! content to show — that happened upstream in the selector.

pub mod chrome;
pub mod modules;

pub use chrome::{render_not_found, render_service_error};
pub use modules::render_module;

use tracing::warn;

use egoweb_common::decision::DecisionMap;
use egoweb_common::model::{Page, Reference, SiteSettings};

use crate::experience::select_content;

/// Escape text for HTML body and attribute positions
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compose the full page: chrome, then each module's selected content in
/// page order.
///
/// Modules still unresolved after graph resolution render nothing; an
/// unresolved section is never worth failing the page over.
pub fn render_page(page: &Page, settings: Option<&SiteSettings>, decisions: &DecisionMap) -> String {
    let mut sections = String::new();
    for module_ref in &page.modules {
        match module_ref {
            Reference::Resolved(module) => {
                let content = select_content(module, decisions);
                sections.push_str(&render_module(content));
            }
            Reference::Link { id } => {
                warn!(module_id = %id, "module unresolved after graph resolution; rendering nothing");
            }
        }
    }

    let mut body = String::new();
    body.push_str(&chrome::render_top_banner());
    body.push_str(&chrome::render_navigation(page.navigation.as_ref(), settings));
    body.push_str("<main>\n");
    body.push_str(&sections);
    body.push_str("</main>\n");
    body.push_str(&chrome::render_footer(settings));

    chrome::page_shell(&page.title, &body)
}
