//! Module section templates
//!
//! One template per module content type. The match below is the whole
//! dispatch table: adding a module variant will not compile until it gets a
//! template here.

use egoweb_common::model::{
    Asset, FeaturedNewsFields, HeroFields, ImageTriplexFields, InfoblockFields, ModuleContent,
    Reference,
};

use super::escape_html;

pub fn render_module(content: &ModuleContent) -> String {
    match content {
        ModuleContent::Hero(fields) => render_hero(fields),
        ModuleContent::Infoblock(fields) => render_infoblock(fields),
        ModuleContent::ImageTriplex(fields) => render_image_triplex(fields),
        ModuleContent::FeaturedNews(fields) => render_featured_news(fields),
    }
}

fn image_url(asset: &Option<Reference<Asset>>) -> Option<String> {
    asset
        .as_ref()
        .and_then(Reference::resolved)
        .map(|a| escape_html(&a.url))
}

fn cta(text: &Option<String>, link: &Option<String>) -> String {
    match (text, link) {
        (Some(text), Some(link)) => format!(
            "<a class=\"cta\" href=\"{}\">{}</a>\n",
            escape_html(link),
            escape_html(text)
        ),
        _ => String::new(),
    }
}

fn render_hero(fields: &HeroFields) -> String {
    let mut out = String::new();
    match image_url(&fields.background_image) {
        Some(url) => out.push_str(&format!(
            "<section class=\"hero\" style=\"background-image:url('{}')\">\n",
            url
        )),
        None => out.push_str("<section class=\"hero\">\n"),
    }
    out.push_str(&format!("<h1>{}</h1>\n", escape_html(&fields.title)));
    if let Some(subtitle) = &fields.subtitle {
        out.push_str(&format!("<p class=\"subtitle\">{}</p>\n", escape_html(subtitle)));
    }
    out.push_str(&cta(&fields.cta_text, &fields.cta_link));
    out.push_str("</section>\n");
    out
}

fn render_infoblock(fields: &InfoblockFields) -> String {
    let mut out = String::from("<section class=\"infoblock\">\n");
    out.push_str(&format!("<h2>{}</h2>\n", escape_html(&fields.title)));
    out.push_str(&format!("<p>{}</p>\n", escape_html(&fields.body)));
    if let Some(url) = image_url(&fields.background_image) {
        out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">\n",
            url,
            escape_html(&fields.title)
        ));
    }
    out.push_str(&cta(&fields.cta_text, &fields.cta_link));
    out.push_str("</section>\n");
    out
}

fn render_image_triplex(fields: &ImageTriplexFields) -> String {
    let mut out = String::from("<section class=\"image-triplex\">\n");
    out.push_str(&format!("<h2>{}</h2>\n", escape_html(&fields.title)));
    out.push_str("<div class=\"triplex-grid\">\n");
    // Item stubs (beyond inclusion depth) are simply not shown
    for item in fields.items.iter().filter_map(Reference::resolved) {
        out.push_str("<article class=\"triplex-card\">\n");
        if let Some(url) = image_url(&item.background_image) {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">\n",
                url,
                escape_html(&item.title)
            ));
        }
        out.push_str(&format!("<h3>{}</h3>\n", escape_html(&item.title)));
        out.push_str(&format!("<p>{}</p>\n", escape_html(&item.body)));
        out.push_str(&cta(&item.cta_text, &item.cta_link));
        out.push_str("</article>\n");
    }
    out.push_str("</div>\n</section>\n");
    out
}

fn render_featured_news(fields: &FeaturedNewsFields) -> String {
    let mut out = String::from("<section class=\"featured-news\">\n");
    out.push_str(&format!("<h2>{}</h2>\n", escape_html(&fields.title)));
    out.push_str("<div class=\"news-grid\">\n");
    for item in fields.items.iter().filter_map(Reference::resolved) {
        out.push_str("<article class=\"news-card\">\n");
        if let Some(url) = image_url(&item.image) {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">\n",
                url,
                escape_html(&item.title)
            ));
        }
        let title = escape_html(&item.title);
        match &item.url {
            Some(link) => out.push_str(&format!(
                "<h3><a href=\"{}\">{}</a></h3>\n",
                escape_html(link),
                title
            )),
            None => out.push_str(&format!("<h3>{}</h3>\n", title)),
        }
        out.push_str(&format!("<p>{}</p>\n", escape_html(&item.body)));
        out.push_str("</article>\n");
    }
    out.push_str("</div>\n</section>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use egoweb_common::model::{NewsItem, TriplexItem};

    #[test]
    fn hero_renders_title_and_cta() {
        let html = render_module(&ModuleContent::Hero(HeroFields {
            title: "Dry skin relief".to_string(),
            subtitle: Some("Backed by science".to_string()),
            cta_text: Some("Shop now".to_string()),
            cta_link: Some("/products".to_string()),
            ..Default::default()
        }));
        assert!(html.contains("<h1>Dry skin relief</h1>"));
        assert!(html.contains("href=\"/products\""));
        assert!(html.contains("Backed by science"));
    }

    #[test]
    fn cta_requires_both_text_and_link() {
        let html = render_module(&ModuleContent::Hero(HeroFields {
            title: "No button".to_string(),
            cta_text: Some("Dangling".to_string()),
            ..Default::default()
        }));
        assert!(!html.contains("class=\"cta\""));
    }

    #[test]
    fn triplex_skips_unresolved_items() {
        let html = render_module(&ModuleContent::ImageTriplex(ImageTriplexFields {
            title: "Our range".to_string(),
            items: vec![
                Reference::Resolved(TriplexItem {
                    title: "QV Bath Oil".to_string(),
                    body: "Gentle cleansing".to_string(),
                    background_image: None,
                    cta_text: None,
                    cta_link: None,
                }),
                Reference::Link {
                    id: "missing".to_string(),
                },
            ],
        }));
        assert!(html.contains("QV Bath Oil"));
        assert_eq!(html.matches("<article").count(), 1);
    }

    #[test]
    fn news_card_links_title_when_url_present() {
        let html = render_module(&ModuleContent::FeaturedNews(FeaturedNewsFields {
            title: "News".to_string(),
            items: vec![Reference::Resolved(NewsItem {
                title: "Launch".to_string(),
                body: "New formula".to_string(),
                image: None,
                url: Some("/news/launch".to_string()),
            })],
        }));
        assert!(html.contains("<a href=\"/news/launch\">Launch</a>"));
    }
}
