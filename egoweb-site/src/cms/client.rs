//! CMS delivery/preview API client
//!
//! Thin HTTP client over the hosted CMS's read API. Two credential modes:
//! the published-content host with the delivery token, and the draft-content
//! host with the preview token, selected per call by a `preview` flag.
//!
//! Single-entry lookups go through the collection endpoint with a `sys.id`
//! filter because only that endpoint honors the `include` depth parameter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use egoweb_common::config::CmsConfig;
use egoweb_common::model::{Page, SiteSettings};
use egoweb_common::{Error, Result};

use super::stitch::{stitch, IncludeMaps};
use super::ContentSource;

/// Published-content API host
const DELIVERY_HOST: &str = "https://cdn.contentful.com";
/// Draft-content API host
const PREVIEW_HOST: &str = "https://preview.contentful.com";

/// HTTP client for the CMS read API
pub struct CmsClient {
    http: Client,
    config: CmsConfig,
}

/// Raw collection response: matched items plus reference side tables
#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(rename = "Entry", default)]
    entries: Vec<Value>,
    #[serde(rename = "Asset", default)]
    assets: Vec<Value>,
}

impl CmsClient {
    pub fn new(config: CmsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn host(&self, preview: bool) -> &'static str {
        if preview {
            PREVIEW_HOST
        } else {
            DELIVERY_HOST
        }
    }

    fn token(&self, preview: bool) -> &str {
        if preview {
            // Callers gate preview mode on the token being configured
            self.config
                .preview_token
                .as_deref()
                .unwrap_or(&self.config.delivery_token)
        } else {
            &self.config.delivery_token
        }
    }

    async fn get_entries(
        &self,
        preview: bool,
        params: &[(&str, String)],
    ) -> Result<EntriesResponse> {
        let url = format!(
            "{}/spaces/{}/environments/{}/entries",
            self.host(preview),
            self.config.space_id,
            self.config.environment
        );
        debug!(%url, preview, "querying CMS entries");

        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token(preview))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cms(format!(
                "entries query returned {}: {}",
                status, body
            )));
        }

        Ok(response.json::<EntriesResponse>().await?)
    }

    /// Stitch the first matched item against the response's include tables
    fn first_stitched(response: EntriesResponse, include_depth: u8) -> Option<Value> {
        let item = response.items.first()?;
        let maps = IncludeMaps::new(&response.includes.entries, &response.includes.assets);
        Some(stitch(item, &maps, include_depth))
    }
}

#[async_trait]
impl ContentSource for CmsClient {
    async fn page_by_slug(&self, slug: &str, preview: bool) -> Result<Option<Page>> {
        let include = self.config.include_depth;
        let response = self
            .get_entries(
                preview,
                &[
                    ("content_type", "page".to_string()),
                    ("fields.slug", slug.to_string()),
                    ("include", include.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let Some(stitched) = Self::first_stitched(response, include) else {
            return Ok(None);
        };
        match Page::from_value(&stitched) {
            Some(page) => Ok(Some(page)),
            None => Err(Error::Cms(format!(
                "page entry for slug '{}' is missing required fields",
                slug
            ))),
        }
    }

    async fn entry_by_id(&self, id: &str, include: u8, preview: bool) -> Result<Value> {
        let response = self
            .get_entries(
                preview,
                &[
                    ("sys.id", id.to_string()),
                    ("include", include.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Self::first_stitched(response, include)
            .ok_or_else(|| Error::NotFound(format!("entry {}", id)))
    }

    async fn site_settings(&self, preview: bool) -> Result<Option<SiteSettings>> {
        let response = self
            .get_entries(
                preview,
                &[
                    (
                        "content_type",
                        self.config.settings_content_type.clone(),
                    ),
                    ("include", "2".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(Self::first_stitched(response, 2)
            .as_ref()
            .and_then(SiteSettings::from_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CmsConfig {
        CmsConfig {
            space_id: "space1".to_string(),
            environment: "master".to_string(),
            delivery_token: "delivery".to_string(),
            preview_token: Some("preview".to_string()),
            include_depth: 10,
            settings_content_type: "siteSettings".to_string(),
            timeout_secs: 10,
        }
    }

    #[test]
    fn preview_flag_selects_host_and_token() {
        let client = CmsClient::new(config()).unwrap();
        assert_eq!(client.host(false), DELIVERY_HOST);
        assert_eq!(client.host(true), PREVIEW_HOST);
        assert_eq!(client.token(false), "delivery");
        assert_eq!(client.token(true), "preview");
    }

    #[test]
    fn preview_token_falls_back_to_delivery_token() {
        let mut cfg = config();
        cfg.preview_token = None;
        let client = CmsClient::new(cfg).unwrap();
        assert_eq!(client.token(true), "delivery");
    }

    #[test]
    fn empty_response_yields_no_item() {
        let response: EntriesResponse = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(CmsClient::first_stitched(response, 10).is_none());
    }
}
