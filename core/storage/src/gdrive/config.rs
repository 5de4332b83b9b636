//! Google Drive client configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
/// Full read/write access to the service account's drive.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Google Drive backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GDriveConfig {
    /// Path to the service-account JSON key.
    pub credentials_path: PathBuf,
    /// OAuth2 scopes requested for every token.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Metadata API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Media upload API base URL.
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
}

impl GDriveConfig {
    /// Configuration with default endpoints and scopes.
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            scopes: default_scopes(),
            api_base: default_api_base(),
            upload_base: default_upload_base(),
        }
    }
}

fn default_scopes() -> Vec<String> {
    vec![DRIVE_SCOPE.to_string()]
}

fn default_api_base() -> String {
    DRIVE_API_BASE.to_string()
}

fn default_upload_base() -> String {
    DRIVE_UPLOAD_BASE.to_string()
}
