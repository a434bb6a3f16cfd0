//! nakamura HTTP client (reqwest-based).
//!
//! Endpoints used:
//!
//! - `GET  /system/userManager/group/{id}.json` - group properties and members
//! - `POST /system/userManager/group/{id}.update.json` - membership and
//!   property changes, as Sling form fields
//! - `POST /system/world/create` - world creation from a JSON `data` field

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use worldsync_core::{
    CreateGroupPayload, GroupDetails, GroupId, GroupProperties, GroupStore, MemberVisibility,
    PropertyPatch, ServerConfig, StoreError, StoreResult, UserId,
};

/// Group document returned by the user manager.
#[derive(Debug, Deserialize)]
struct GroupResponse {
    #[serde(default)]
    properties: Option<GroupProperties>,
    #[serde(default)]
    members: Vec<String>,
}

/// [`GroupStore`] talking to a nakamura server.
#[derive(Debug, Clone)]
pub struct NakamuraStore {
    /// Server root, without trailing slash.
    base_url: String,
    username: String,
    password: Option<String>,
    http_client: Client,
}

impl NakamuraStore {
    /// Create a store from the server section of the import configuration.
    pub fn new(config: &ServerConfig) -> StoreResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("worldsync/0.1")
            .build()
            .map_err(|e| StoreError::ConnectionFailed {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self::with_http_client(
            &config.url,
            &config.username,
            config.password.clone(),
            http_client,
        ))
    }

    /// Create a store with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: &str,
        username: &str,
        password: Option<String>,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn group_url(&self, group_id: &GroupId) -> String {
        format!("{}/system/userManager/group/{}.json", self.base_url, group_id)
    }

    fn update_url(&self, group_id: &GroupId) -> String {
        format!(
            "{}/system/userManager/group/{}.update.json",
            self.base_url, group_id
        )
    }

    /// Sling rejects modifying requests without a Referer from the same host.
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.username, self.password.as_deref())
            .header("Referer", format!("{}/", self.base_url))
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    /// Fetch a group document; `None` on 404.
    async fn fetch_group(&self, group_id: &GroupId) -> StoreResult<Option<GroupResponse>> {
        let url = self.group_url(group_id);
        debug!("nakamura GET {}", url);
        let response = self
            .authorized(self.http_client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| StoreError::InvalidData {
                message: format!("failed to parse group {group_id}: {e}"),
            })
    }

    async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> StoreResult<()> {
        debug!("nakamura POST {}", url);
        let response = self
            .authorized(self.http_client.post(url))
            .form(fields)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl GroupStore for NakamuraStore {
    async fn get_group_details(&self, group_id: &GroupId) -> StoreResult<Option<GroupDetails>> {
        Ok(self.fetch_group(group_id).await?.map(|group| GroupDetails {
            properties: group.properties,
        }))
    }

    async fn get_role_subgroup_members(
        &self,
        subgroup_id: &GroupId,
    ) -> StoreResult<HashSet<UserId>> {
        let group = self
            .fetch_group(subgroup_id)
            .await?
            .ok_or_else(|| StoreError::GroupNotFound {
                group_id: subgroup_id.clone(),
            })?;
        Ok(group.members.into_iter().map(UserId::from).collect())
    }

    async fn add_member(
        &self,
        subgroup_id: &GroupId,
        user_id: &UserId,
        visibility: MemberVisibility,
    ) -> StoreResult<()> {
        let user = user_id.as_str();
        let url = self.update_url(subgroup_id);
        match visibility {
            MemberVisibility::Viewer => {
                self.post_form(&url, &[(":member", user), (":viewer", user)])
                    .await
            }
            MemberVisibility::Member => self.post_form(&url, &[(":member", user)]).await,
        }
    }

    async fn remove_member(&self, subgroup_id: &GroupId, user_id: &UserId) -> StoreResult<()> {
        let user = user_id.as_str();
        self.post_form(
            &self.update_url(subgroup_id),
            &[(":member@Delete", user), (":viewer@Delete", user)],
        )
        .await
    }

    async fn create_group(
        &self,
        group_id: &GroupId,
        payload: &CreateGroupPayload,
    ) -> StoreResult<()> {
        let data = serde_json::to_string(payload).map_err(|e| StoreError::InvalidData {
            message: format!("failed to encode world {group_id}: {e}"),
        })?;
        let url = format!("{}/system/world/create", self.base_url);
        self.post_form(&url, &[("data", data.as_str())]).await
    }

    async fn update_group_properties(
        &self,
        group_id: &GroupId,
        patch: &PropertyPatch,
    ) -> StoreResult<()> {
        let mut fields = patch.pairs();
        fields.push(("_charset_", "utf-8"));
        self.post_form(&self.update_url(group_id), &fields).await
    }
}

// ── Response Handling ─────────────────────────────────────────────

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout {
            message: e.to_string(),
        }
    } else {
        StoreError::ConnectionFailed {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::AuthenticationFailed),
        _ => {
            let message = if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            };
            Err(StoreError::UnexpectedResponse {
                status: status.as_u16(),
                message,
            })
        }
    }
}
