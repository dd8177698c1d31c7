//! Static page chrome: shell, navigation, banner, footer, error pages

use egoweb_common::model::{NavItem, Navigation, SiteSettings};

use super::escape_html;

const DEFAULT_SITE_NAME: &str = "Ego Pharmaceuticals";

/// Wrap rendered body content in the document shell
pub fn page_shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}

pub fn render_top_banner() -> String {
    "<div class=\"top-banner\">Caring for skin since 1953</div>\n".to_string()
}

pub fn render_navigation(
    navigation: Option<&Navigation>,
    settings: Option<&SiteSettings>,
) -> String {
    let site_name = settings
        .and_then(|s| s.site_name.as_deref())
        .unwrap_or(DEFAULT_SITE_NAME);

    let mut out = String::from("<header class=\"site-header\">\n");
    match settings.and_then(|s| s.logo.as_ref()) {
        Some(logo) => out.push_str(&format!(
            "<a class=\"brand\" href=\"/\"><img src=\"{}\" alt=\"{}\"></a>\n",
            escape_html(&logo.url),
            escape_html(site_name)
        )),
        None => out.push_str(&format!(
            "<a class=\"brand\" href=\"/\">{}</a>\n",
            escape_html(site_name)
        )),
    }

    if let Some(navigation) = navigation {
        out.push_str("<nav><ul>\n");
        for item in &navigation.items {
            out.push_str(&nav_item(item));
        }
        out.push_str("</ul></nav>\n");
    }
    out.push_str("</header>\n");
    out
}

fn nav_item(item: &NavItem) -> String {
    let mut out = format!(
        "<li><a href=\"{}\">{}</a>",
        escape_html(&item.url),
        escape_html(&item.label)
    );
    if !item.children.is_empty() {
        out.push_str("<ul>");
        for child in &item.children {
            out.push_str(&nav_item(child));
        }
        out.push_str("</ul>");
    }
    out.push_str("</li>\n");
    out
}

pub fn render_footer(settings: Option<&SiteSettings>) -> String {
    let site_name = settings
        .and_then(|s| s.site_name.as_deref())
        .unwrap_or(DEFAULT_SITE_NAME);
    format!(
        "<footer class=\"site-footer\"><p>&copy; {}</p></footer>\n",
        escape_html(site_name)
    )
}

/// User-visible "not found" state for an unknown slug
pub fn render_not_found(slug: &str) -> String {
    let body = format!(
        "<main class=\"error-page\">\n<h1>Page not found</h1>\n\
         <p>No page exists for &quot;{}&quot;.</p>\n<a href=\"/\">Back to home</a>\n</main>\n",
        escape_html(slug)
    );
    page_shell("Page not found", &body)
}

/// Shown when the content store itself is unreachable
pub fn render_service_error() -> String {
    let body = "<main class=\"error-page\">\n<h1>Something went wrong</h1>\n\
                <p>Please try again in a moment.</p>\n</main>\n";
    page_shell("Something went wrong", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_nests_children() {
        let navigation = Navigation {
            id: "nav1".to_string(),
            title: "Main".to_string(),
            items: vec![NavItem {
                label: "Products".to_string(),
                url: "/products".to_string(),
                children: vec![NavItem {
                    label: "QV".to_string(),
                    url: "/products/qv".to_string(),
                    children: Vec::new(),
                }],
            }],
        };

        let html = render_navigation(Some(&navigation), None);
        assert!(html.contains("href=\"/products\""));
        assert!(html.contains("href=\"/products/qv\""));
    }

    #[test]
    fn settings_override_brand_name() {
        let settings = SiteSettings {
            site_name: Some("Ego Labs".to_string()),
            logo: None,
        };
        let html = render_navigation(None, Some(&settings));
        assert!(html.contains("Ego Labs"));
    }

    #[test]
    fn not_found_page_escapes_slug() {
        let html = render_not_found("<bad>");
        assert!(!html.contains("<bad>"));
        assert!(html.contains("&lt;bad&gt;"));
    }
}
