//! Remote personalization (experience) API client
//!
//! Profile storage, audience-rule evaluation, and experiment bucketing all
//! live in the hosted service; this client only fetches or creates a profile
//! and reads back the per-experience decisions the service computed.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use egoweb_common::decision::{Decision, Profile};
use egoweb_common::{Error, Result};

/// Experience API base URL
const EXPERIENCE_API_URL: &str = "https://experience.ninetailed.co/v2";

/// Profile snapshot plus the decisions computed for it
#[derive(Debug, Clone)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub decisions: Vec<Decision>,
}

#[derive(Debug, Deserialize)]
struct RawProfileResponse {
    profile: Profile,
    #[serde(default)]
    experiences: Vec<Decision>,
}

#[derive(Debug, Serialize)]
struct CreateProfileRequest {
    events: Vec<Value>,
}

/// HTTP client for the experience API, parameterized by organization key
/// and environment name
pub struct ProfileApiClient {
    http: Client,
    base_url: String,
    api_key: String,
    environment: String,
}

impl ProfileApiClient {
    pub fn new(api_key: String, environment: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: EXPERIENCE_API_URL.to_string(),
            api_key,
            environment,
        })
    }

    /// Point the client at a different endpoint (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn profiles_url(&self) -> String {
        format!(
            "{}/organizations/{}/environments/{}/profiles",
            self.base_url, self.api_key, self.environment
        )
    }

    /// Fetch an existing profile and its decisions.
    ///
    /// `Error::NotFound` when the service no longer knows the id; callers
    /// fall back to [`create_profile`](Self::create_profile).
    pub async fn get_profile(&self, profile_id: &str) -> Result<ProfileResponse> {
        let url = format!("{}/{}", self.profiles_url(), profile_id);
        debug!(profile_id, "fetching personalization profile");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(Error::NotFound(format!("profile {}", profile_id)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "profile fetch returned {}: {}",
                status, body
            )));
        }

        let raw: RawProfileResponse = response.json().await?;
        debug!(
            profile_id,
            audiences = raw.profile.audiences.len(),
            decisions = raw.experiences.len(),
            "profile fetched"
        );
        Ok(ProfileResponse {
            profile: raw.profile,
            decisions: raw.experiences,
        })
    }

    /// Create a fresh profile; the service mints the id
    pub async fn create_profile(&self) -> Result<ProfileResponse> {
        debug!("creating personalization profile");

        let response = self
            .http
            .post(self.profiles_url())
            .json(&CreateProfileRequest { events: Vec::new() })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "profile create returned {}: {}",
                status, body
            )));
        }

        let raw: RawProfileResponse = response.json().await?;
        Ok(ProfileResponse {
            profile: raw.profile,
            decisions: raw.experiences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_url_embeds_org_and_environment() {
        let client = ProfileApiClient::new(
            "org-key".to_string(),
            "main".to_string(),
            Duration::from_secs(4),
        )
        .unwrap();
        assert_eq!(
            client.profiles_url(),
            "https://experience.ninetailed.co/v2/organizations/org-key/environments/main/profiles"
        );
    }

    #[test]
    fn raw_response_parses_service_shape() {
        let raw: RawProfileResponse = serde_json::from_str(
            r#"{
                "profile": {
                    "id": "p-1",
                    "audiences": ["returning-visitors"],
                    "session": { "isReturningVisitor": true, "count": 3 }
                },
                "experiences": [
                    { "experienceId": "exp-1", "variantIndex": 1 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(raw.profile.id, "p-1");
        assert!(raw.profile.session.is_returning_visitor);
        assert_eq!(raw.experiences[0].variant_index, 1);
    }

    #[test]
    fn missing_experiences_defaults_to_empty() {
        let raw: RawProfileResponse =
            serde_json::from_str(r#"{ "profile": { "id": "p-2" } }"#).unwrap();
        assert!(raw.experiences.is_empty());
    }
}
