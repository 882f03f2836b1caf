//! # warden-ztapi
//!
//! Client for the remote network-management API (ZeroTier Central style).
//!
//! Every remote operation is best-effort: failures of any kind (transport,
//! timeout, authorization, 404, undecodable body) are logged and reported
//! as `None`/`false`. Callers treat that as "unavailable, retry next pass".
//!
//! The client owns a pooled HTTP connection set. Dropping it releases the
//! pool on every exit path.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use warden_types::network::{Member, Network, TagUpdate, TagUpdateConfig};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.zerotier.com/api/v1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while building a client. Remote calls never fail.
#[derive(Debug, thiserror::Error)]
pub enum ZtApiError {
    #[error("credential is not a valid header value")]
    InvalidCredential,

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Authenticated API client.
#[derive(Debug, Clone)]
pub struct ZtApiClient {
    base_url: String,
    http: Client,
}

impl ZtApiClient {
    /// Build a client sending `Authorization: token {token}` on every request.
    pub fn new(
        token: &str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ZtApiError> {
        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|_| ZtApiError::InvalidCredential)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, http })
    }

    /// Base endpoint without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a network descriptor with its tag schema.
    pub async fn get_network(&self, network_id: &str) -> Option<Network> {
        self.get_json(&format!("/network/{network_id}")).await
    }

    /// Fetch all members of a network.
    ///
    /// Members are decoded one by one; an undecodable entry is logged and
    /// left out rather than failing the whole listing.
    pub async fn get_members(&self, network_id: &str) -> Option<Vec<Member>> {
        let raw: Vec<serde_json::Value> = self
            .get_json(&format!("/network/{network_id}/member"))
            .await?;
        let members = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Member>(value) {
                Ok(member) => Some(member),
                Err(e) => {
                    warn!(network_id, "Skipping undecodable member: {e}");
                    None
                }
            })
            .collect();
        Some(members)
    }

    /// Fetch one member. `None` on not-found and on any other failure.
    pub async fn get_member(&self, network_id: &str, member_id: &str) -> Option<Member> {
        self.get_json(&format!("/network/{network_id}/member/{member_id}"))
            .await
    }

    /// Set `tag_name` to `enum_value_name` on a member.
    ///
    /// Other tag entries are sent back untouched. Returns whether the update
    /// was accepted; never fails.
    pub async fn tag_member(
        &self,
        network: &Network,
        member: &Member,
        tag_name: &str,
        enum_value_name: &str,
    ) -> bool {
        let Some(entry) = network.resolve(tag_name, enum_value_name) else {
            warn!(
                network_id = %network.id,
                tag = tag_name,
                value = enum_value_name,
                "Tag or enum value missing from network schema"
            );
            return false;
        };

        let body = TagUpdate {
            config: TagUpdateConfig {
                tags: member.tags_with(entry),
            },
        };
        let path = format!("/network/{}/member/{}", network.id, member.id());

        match self.http.post(self.url(&path)).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(member_id = member.id(), tag = tag_name, value = enum_value_name, "Member tagged");
                true
            }
            Ok(resp) => {
                warn!(member_id = member.id(), status = %resp.status(), "Tag update rejected");
                false
            }
            Err(e) => {
                warn!(member_id = member.id(), "Tag update failed: {e}");
                false
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let resp = match self.http.get(self.url(path)).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(path, "Request failed: {e}");
                return None;
            }
        };

        match resp.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                debug!(path, "Not found");
                return None;
            }
            status => {
                warn!(path, %status, "Request returned non-success status");
                return None;
            }
        }

        match resp.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path, "Failed to decode response: {e}");
                None
            }
        }
    }
}
