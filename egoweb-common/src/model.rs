//! CMS entry graph model
//!
//! Entries arrive from the CMS as JSON whose reference fields are either
//! *link stubs* (identifier only) or resolved entries, depending on how far
//! the requested inclusion depth reached from the root. [`Reference`] keeps
//! that distinction explicit; the content graph resolver fills in stubs
//! after the fact.
//!
//! Modules are a closed sum type over content-type tags so that adding a
//! module type forces every dispatch site to be revisited at compile time.

use serde_json::Value;
use tracing::warn;

/// Generated schema id the CMS uses for the featured-news content type.
/// Alias of `featuredNews`; both tags select the same module variant.
pub const FEATURED_NEWS_SCHEMA_ID: &str = "6NbIn3MpiND4Hybq2U6NV8";

// ========================================
// sys helpers
// ========================================

fn sys(value: &Value) -> Option<&Value> {
    value.get("sys")
}

/// Stable entry identifier from the `sys` envelope
pub fn sys_id(value: &Value) -> Option<&str> {
    sys(value)?.get("id")?.as_str()
}

/// True when the node is a link stub (`sys.type == "Link"`), i.e. the CMS
/// returned an identifier without field data
pub fn is_link(value: &Value) -> bool {
    sys(value)
        .and_then(|s| s.get("type"))
        .and_then(|t| t.as_str())
        == Some("Link")
}

/// Content-type tag from `sys.contentType.sys.id`
pub fn content_type_id(value: &Value) -> Option<&str> {
    sys(value)?
        .get("contentType")?
        .get("sys")?
        .get("id")?
        .as_str()
}

fn fields(value: &Value) -> Option<&Value> {
    value.get("fields")
}

fn str_field(fields: &Value, name: &str) -> Option<String> {
    fields.get(name)?.as_str().map(str::to_string)
}

// ========================================
// References
// ========================================

/// A reference field: either an unresolved link stub or a materialized value
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<T> {
    /// Identifier-only stub; field data was beyond the inclusion depth or a
    /// fetch for it failed
    Link { id: String },
    /// Fully materialized value
    Resolved(T),
}

impl<T> Reference<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Reference::Resolved(v) => Some(v),
            Reference::Link { .. } => None,
        }
    }

    pub fn resolved_mut(&mut self) -> Option<&mut T> {
        match self {
            Reference::Resolved(v) => Some(v),
            Reference::Link { .. } => None,
        }
    }

    /// Identifier of an unresolved stub; `None` once resolved
    pub fn link_id(&self) -> Option<&str> {
        match self {
            Reference::Link { id } => Some(id),
            Reference::Resolved(_) => None,
        }
    }

    /// Parse a reference node. A link stub stays a stub. A resolved entry is
    /// handed to `parse`; if that fails the node degrades to a stub so a
    /// later on-demand fetch can retry it. Nodes without an identifier are
    /// unusable and yield `None`.
    pub fn parse_with(value: &Value, parse: impl FnOnce(&Value) -> Option<T>) -> Option<Self> {
        let id = sys_id(value)?.to_string();
        if is_link(value) {
            return Some(Reference::Link { id });
        }
        match parse(value) {
            Some(v) => Some(Reference::Resolved(v)),
            None => Some(Reference::Link { id }),
        }
    }
}

// ========================================
// Assets
// ========================================

/// An image or file asset
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl Asset {
    pub fn from_value(value: &Value) -> Option<Self> {
        let f = fields(value)?;
        Some(Asset {
            id: sys_id(value)?.to_string(),
            title: str_field(f, "title").unwrap_or_default(),
            url: f.get("file")?.get("url")?.as_str()?.to_string(),
        })
    }
}

fn asset_field(fields: &Value, name: &str) -> Option<Reference<Asset>> {
    Reference::parse_with(fields.get(name)?, Asset::from_value)
}

// ========================================
// Module content (closed sum over content types)
// ========================================

/// Full-width banner section with background image and call to action
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeroFields {
    pub title: String,
    pub subtitle: Option<String>,
    pub background_image: Option<Reference<Asset>>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub image_location: Option<String>,
}

/// Text block with optional background image and call to action
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfoblockFields {
    pub title: String,
    pub body: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub background_image: Option<Reference<Asset>>,
}

/// One card of an image triplex
#[derive(Debug, Clone, PartialEq)]
pub struct TriplexItem {
    pub title: String,
    pub body: String,
    pub background_image: Option<Reference<Asset>>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
}

/// Three-up image card row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageTriplexFields {
    pub title: String,
    pub items: Vec<Reference<TriplexItem>>,
}

/// One news teaser card
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub body: String,
    pub image: Option<Reference<Asset>>,
    pub url: Option<String>,
}

/// News teaser card row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeaturedNewsFields {
    pub title: String,
    pub items: Vec<Reference<NewsItem>>,
}

/// The renderable content of a module, tagged by content type
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleContent {
    Hero(HeroFields),
    Infoblock(InfoblockFields),
    ImageTriplex(ImageTriplexFields),
    FeaturedNews(FeaturedNewsFields),
}

impl ModuleContent {
    /// Canonical content-type tag (aliases collapse to one tag)
    pub fn content_type(&self) -> &'static str {
        match self {
            ModuleContent::Hero(_) => "hero",
            ModuleContent::Infoblock(_) => "infoblock",
            ModuleContent::ImageTriplex(_) => "imageTriplex",
            ModuleContent::FeaturedNews(_) => "featuredNews",
        }
    }

    /// Parse module fields for a content-type tag. Returns `None` for tags
    /// outside the closed set; callers decide whether that is worth a log.
    pub fn parse(content_type: &str, f: &Value) -> Option<Self> {
        match content_type {
            "hero" => Some(ModuleContent::Hero(HeroFields {
                title: str_field(f, "title").unwrap_or_default(),
                subtitle: str_field(f, "subtitle"),
                background_image: asset_field(f, "backgroundImage"),
                cta_text: str_field(f, "ctaText"),
                cta_link: str_field(f, "ctaLink"),
                image_location: str_field(f, "imageLocation"),
            })),
            "infoblock" => Some(ModuleContent::Infoblock(InfoblockFields {
                title: str_field(f, "title").unwrap_or_default(),
                body: str_field(f, "body").unwrap_or_default(),
                cta_text: str_field(f, "ctaText"),
                cta_link: str_field(f, "ctaLink"),
                background_image: asset_field(f, "backgroundImage"),
            })),
            "imageTriplex" => Some(ModuleContent::ImageTriplex(ImageTriplexFields {
                title: str_field(f, "title").unwrap_or_default(),
                items: reference_list(f.get("items"), TriplexItem::from_value),
            })),
            "featuredNews" | FEATURED_NEWS_SCHEMA_ID => {
                Some(ModuleContent::FeaturedNews(FeaturedNewsFields {
                    title: str_field(f, "title").unwrap_or_default(),
                    items: reference_list(f.get("items"), NewsItem::from_value),
                }))
            }
            _ => None,
        }
    }
}

impl TriplexItem {
    fn from_value(value: &Value) -> Option<Self> {
        let f = fields(value)?;
        Some(TriplexItem {
            title: str_field(f, "title").unwrap_or_default(),
            body: str_field(f, "body").unwrap_or_default(),
            background_image: asset_field(f, "backgroundImage"),
            cta_text: str_field(f, "ctaText"),
            cta_link: str_field(f, "ctaLink"),
        })
    }
}

impl NewsItem {
    fn from_value(value: &Value) -> Option<Self> {
        let f = fields(value)?;
        Some(NewsItem {
            title: str_field(f, "title").unwrap_or_default(),
            body: str_field(f, "body").unwrap_or_default(),
            image: asset_field(f, "image"),
            url: str_field(f, "url"),
        })
    }
}

fn reference_list<T>(
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Option<T> + Copy,
) -> Vec<Reference<T>> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| Reference::parse_with(v, parse))
                .collect()
        })
        .unwrap_or_default()
}

// ========================================
// Modules and experiences
// ========================================

/// A page section: baseline content plus any attached experiences
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEntry {
    pub id: String,
    pub content: ModuleContent,
    pub experiences: Vec<Reference<Experience>>,
}

impl ModuleEntry {
    /// Parse a resolved module entry. Returns `None` for link stubs, for
    /// content types outside the module set, and for entries without an id.
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_link(value) {
            return None;
        }
        let id = sys_id(value)?.to_string();
        let content_type = content_type_id(value)?;
        let f = fields(value)?;
        let content = ModuleContent::parse(content_type, f)?;
        let experiences = reference_list(f.get("nt_experiences"), Experience::from_value);
        Some(ModuleEntry {
            id,
            content,
            experiences,
        })
    }
}

/// Personalization vs A/B experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceType {
    Personalization,
    Experiment,
}

impl ExperienceType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "nt_personalization" => Some(ExperienceType::Personalization),
            "nt_experiment" => Some(ExperienceType::Experiment),
            _ => None,
        }
    }
}

/// Traffic configuration for experiment-type experiences. Carried through
/// for observability; bucketing happens in the remote service, never here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExperienceConfig {
    pub traffic: Option<f64>,
    pub distribution: Vec<f64>,
}

impl ExperienceConfig {
    fn from_value(value: &Value) -> Self {
        ExperienceConfig {
            traffic: value.get("traffic").and_then(Value::as_f64),
            distribution: value
                .get("distribution")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default(),
        }
    }
}

/// One personalization rule attached to a module: an audience plus an
/// ordered variant list.
///
/// Variant order is significant: a decision's `variant_index` of `i >= 1`
/// selects `variants[i - 1]`; index 0 means baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    /// Stable experience identifier; decisions are keyed by this
    pub id: String,
    pub name: String,
    /// `None` when the CMS carried an unrecognized type tag; such an
    /// experience never passes validity
    pub kind: Option<ExperienceType>,
    pub config: Option<ExperienceConfig>,
    pub audience: Option<Reference<Audience>>,
    pub variants: Vec<Reference<ModuleEntry>>,
}

impl Experience {
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_link(value) {
            return None;
        }
        let id = sys_id(value)?.to_string();
        let f = fields(value)?;
        Some(Experience {
            id,
            name: str_field(f, "nt_name").unwrap_or_default(),
            kind: str_field(f, "nt_type").as_deref().and_then(ExperienceType::from_tag),
            config: f.get("nt_config").map(ExperienceConfig::from_value),
            audience: f
                .get("nt_audience")
                .and_then(|v| Reference::parse_with(v, Audience::from_value)),
            variants: reference_list(f.get("nt_variants"), ModuleEntry::from_value),
        })
    }

    /// Structural validity: identity fields present and at least one variant
    /// actually has field data. Invalid experiences are dropped silently by
    /// the extractor, which degrades the module to baseline.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && self.kind.is_some()
            && self.variants.iter().any(Reference::is_resolved)
    }
}

/// A visitor segment; rule evaluation happens remotely
#[derive(Debug, Clone, PartialEq)]
pub struct Audience {
    pub id: String,
    pub name: String,
    /// Identifier the personalization service reports memberships under
    pub audience_id: String,
    pub description: Option<String>,
}

impl Audience {
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_link(value) {
            return None;
        }
        let id = sys_id(value)?.to_string();
        let f = fields(value)?;
        let audience_id = str_field(f, "nt_audience_id").unwrap_or_else(|| id.clone());
        Some(Audience {
            id,
            name: str_field(f, "nt_name").unwrap_or_default(),
            audience_id,
            description: str_field(f, "nt_description"),
        })
    }
}

// ========================================
// Pages and chrome
// ========================================

/// One link in the navigation bar
#[derive(Debug, Clone, PartialEq)]
pub struct NavItem {
    pub label: String,
    pub url: String,
    pub children: Vec<NavItem>,
}

impl NavItem {
    fn from_value(value: &Value) -> Option<Self> {
        let f = fields(value)?;
        Some(NavItem {
            label: str_field(f, "label")?,
            url: str_field(f, "url").unwrap_or_else(|| "#".to_string()),
            children: f
                .get("children")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(NavItem::from_value).collect())
                .unwrap_or_default(),
        })
    }
}

/// Navigation bar content
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub id: String,
    pub title: String,
    pub items: Vec<NavItem>,
}

impl Navigation {
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_link(value) {
            return None;
        }
        let id = sys_id(value)?.to_string();
        let f = fields(value)?;
        Some(Navigation {
            id,
            title: str_field(f, "title").unwrap_or_default(),
            items: f
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(NavItem::from_value).collect())
                .unwrap_or_default(),
        })
    }
}

/// Site-wide settings singleton (logo, site name)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteSettings {
    pub site_name: Option<String>,
    pub logo: Option<Asset>,
}

impl SiteSettings {
    pub fn from_value(value: &Value) -> Option<Self> {
        let f = fields(value)?;
        Some(SiteSettings {
            site_name: str_field(f, "siteName"),
            logo: f.get("logo").and_then(Asset::from_value),
        })
    }
}

/// Root page entry: slug, chrome references, ordered module list
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub navigation: Option<Navigation>,
    pub modules: Vec<Reference<ModuleEntry>>,
}

impl Page {
    /// Parse a page entry. Modules whose content type is outside the module
    /// set render nothing; they are dropped here with a warning.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = sys_id(value)?.to_string();
        let f = fields(value)?;
        let slug = str_field(f, "slug")?;

        let mut modules = Vec::new();
        if let Some(items) = f.get("modules").and_then(Value::as_array) {
            for item in items {
                let Some(item_id) = sys_id(item) else {
                    continue;
                };
                if is_link(item) {
                    modules.push(Reference::Link {
                        id: item_id.to_string(),
                    });
                    continue;
                }
                match ModuleEntry::from_value(item) {
                    Some(module) => modules.push(Reference::Resolved(module)),
                    None => {
                        warn!(
                            module_id = %item_id,
                            content_type = ?content_type_id(item),
                            "module content type cannot be handled; skipping"
                        );
                    }
                }
            }
        }

        Some(Page {
            id,
            title: str_field(f, "title").unwrap_or_default(),
            slug,
            navigation: f.get("navigation").and_then(Navigation::from_value),
            modules,
        })
    }
}

// ========================================
// Tests
// ========================================
