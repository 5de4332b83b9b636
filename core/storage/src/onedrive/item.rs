//! Graph response envelopes.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use cloudbridge_common::FileRecord;

/// A file or folder in a drive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Item ID
    pub id: String,
    /// Item name
    pub name: String,
    /// Browser link
    #[serde(default)]
    pub web_url: Option<String>,
    /// Short-lived pre-authenticated content URL
    #[serde(rename = "@microsoft.graph.downloadUrl", default)]
    pub download_url: Option<String>,
    /// Folder facet, set only on folders
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification time
    #[serde(default)]
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

impl DriveItem {
    /// Items with a `folder` facet are folders.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// Present only on folders.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    /// Number of direct children
    #[serde(default)]
    pub child_count: Option<u64>,
}

impl From<DriveItem> for FileRecord {
    fn from(item: DriveItem) -> Self {
        let is_folder = item.is_folder();
        FileRecord {
            id: item.id,
            name: item.name,
            web_link: item.web_url,
            download_link: item.download_url,
            is_folder,
            size: if is_folder { None } else { item.size },
            modified: item.last_modified_date_time,
        }
    }
}

/// One page of a `children` listing.
#[derive(Debug, Deserialize)]
pub(crate) struct ChildrenPage {
    #[serde(default)]
    pub value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Response to `createUploadSession`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadSession {
    pub upload_url: String,
}

/// Site metadata; only the id is used.
#[derive(Debug, Deserialize)]
pub(crate) struct Site {
    pub id: String,
}
