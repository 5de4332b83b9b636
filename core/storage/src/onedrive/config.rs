//! Microsoft Graph client configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Microsoft identity platform host.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
/// Microsoft Graph API base URL.
pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Which drive the client operates on.
///
/// App-only tokens have no signed-in user, so `Me` only works for tenants
/// that map it; the other variants address a drive explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum DriveTarget {
    /// `/me/drive`
    #[default]
    Me,
    /// `/users/{id}/drive`
    User(String),
    /// `/sites/{id}/drive`
    Site(String),
    /// `/drives/{id}`
    Drive(String),
}

impl DriveTarget {
    /// Path of the drive relative to the Graph base URL.
    pub fn path(&self) -> String {
        match self {
            DriveTarget::Me => "me/drive".to_string(),
            DriveTarget::User(id) => format!("users/{}/drive", id),
            DriveTarget::Site(id) => format!("sites/{}/drive", id),
            DriveTarget::Drive(id) => format!("drives/{}", id),
        }
    }
}

/// Microsoft Graph backend configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneDriveConfig {
    /// Application (client) id.
    pub client_id: String,
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Token cache location. Accepted for compatibility; tokens are never persisted.
    #[serde(default)]
    pub token_cache_path: Option<PathBuf>,
    /// Identity provider host.
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    /// Graph API base URL.
    #[serde(default = "default_graph_base")]
    pub graph_base: String,
    /// Drive addressed by item operations.
    #[serde(default)]
    pub drive: DriveTarget,
}

impl OneDriveConfig {
    /// Configuration with default endpoints, addressing `/me/drive`.
    pub fn new(
        client_id: impl Into<String>,
        tenant_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            client_secret: client_secret.into(),
            token_cache_path: None,
            authority_host: default_authority_host(),
            graph_base: default_graph_base(),
            drive: DriveTarget::default(),
        }
    }

    /// Client-credentials token endpoint for the tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl fmt::Debug for OneDriveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneDriveConfig")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_secret", &"<redacted>")
            .field("token_cache_path", &self.token_cache_path)
            .field("authority_host", &self.authority_host)
            .field("graph_base", &self.graph_base)
            .field("drive", &self.drive)
            .finish()
    }
}

fn default_authority_host() -> String {
    AUTHORITY_HOST.to_string()
}

fn default_graph_base() -> String {
    GRAPH_BASE.to_string()
}
