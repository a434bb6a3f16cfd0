//! Import configuration.
//!
//! One JSON document holds the store connection settings and a section per
//! input category. Category keys are accepted both as the file names used by
//! the import jobs (`members.csv`, `worlds.csv`) and bare (`members`, `worlds`).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{SyncError, SyncResult};
use crate::ids::{GroupId, RoleId};

/// Root import configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default, rename = "members.csv", alias = "members")]
    pub members: MembersConfig,
    #[serde(default, rename = "worlds.csv", alias = "worlds")]
    pub worlds: WorldsConfig,
}

/// Connection settings for the group store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: default_username(),
            password: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// `members.csv` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersConfig {
    #[serde(default)]
    pub skip_first_row: bool,
    #[serde(default)]
    pub role_maps: RoleMap,
}

impl MembersConfig {
    /// Columns a membership row must carry: user, world id, role.
    pub const EXPECTED_COLUMNS: usize = 3;
}

/// `worlds.csv` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldsConfig {
    #[serde(default)]
    pub skip_first_row: bool,
    /// Property names for the trailing columns. The first entry names the
    /// grouping column and is normally `"grouping"`.
    #[serde(default)]
    pub custom_properties: Vec<String>,
    /// Template code (as found in the input) to world template path.
    #[serde(default)]
    pub world_template_map: HashMap<String, String>,
    /// Grouping used when a row leaves its grouping column empty.
    #[serde(default)]
    pub global_grouping: Option<String>,
}

impl WorldsConfig {
    /// Columns a world row must carry.
    pub fn expected_columns(&self) -> usize {
        11 + self.custom_properties.len()
    }

    /// Resolves the template path for a template code.
    pub fn template_for(&self, group_id: &GroupId, code: &str) -> SyncResult<&str> {
        self.world_template_map
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| SyncError::MissingTemplate {
                group_id: group_id.clone(),
                code: code.to_string(),
            })
    }
}

/// World type -> (input role label -> canonical role id).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RoleMap(HashMap<String, HashMap<String, String>>);

impl RoleMap {
    /// Builds a role map from `(world type, label, role)` triples.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut map: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (world_type, label, role) in entries {
            map.entry(world_type.to_string())
                .or_default()
                .insert(label.to_string(), role.to_string());
        }
        Self(map)
    }

    /// Translates an input role label for a world of the given type.
    pub fn resolve(&self, group_id: &GroupId, world_type: &str, label: &str) -> SyncResult<RoleId> {
        let labels = self
            .0
            .get(world_type)
            .ok_or_else(|| SyncError::UnmappedWorldType {
                group_id: group_id.clone(),
                world_type: world_type.to_string(),
            })?;

        labels
            .get(label)
            .map(|role| RoleId::new(role.as_str()))
            .ok_or_else(|| SyncError::UnmappedRole {
                group_id: group_id.clone(),
                world_type: world_type.to_string(),
                role: label.to_string(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ImportConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SyncError::InvalidConfiguration {
                message: format!(
                    "failed to read config file {}: {e}",
                    path.as_ref().display()
                ),
            }
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> SyncResult<Self> {
        serde_json::from_str(content).map_err(|e| SyncError::InvalidConfiguration {
            message: format!("failed to parse config: {e}"),
        })
    }

    /// Apply environment variable overrides to the server section.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("WORLDSYNC_SERVER_URL") {
            self.server.url = url;
        }
        if let Ok(username) = std::env::var("WORLDSYNC_USERNAME") {
            self.server.username = username;
        }
        if let Ok(password) = std::env::var("WORLDSYNC_PASSWORD") {
            self.server.password = Some(password);
        }
    }
}
