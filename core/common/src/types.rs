//! Common types used throughout cloudbridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Metadata for a remote file or folder, as returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Vendor-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Shareable browser link.
    #[serde(default)]
    pub web_link: Option<String>,
    /// Pre-authenticated content link.
    #[serde(default)]
    pub download_link: Option<String>,
    /// Whether this is a folder.
    #[serde(default)]
    pub is_folder: bool,
    /// Size in bytes (None for folders or when not reported).
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification time.
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Create a record with only an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            web_link: None,
            download_link: None,
            is_folder: false,
            size: None,
            modified: None,
        }
    }

    /// Best link to hand out for this record.
    ///
    /// Prefers the download link, then the shareable link, and falls back
    /// to the bare identifier.
    pub fn link(&self) -> &str {
        self.download_link
            .as_deref()
            .or(self.web_link.as_deref())
            .unwrap_or(&self.id)
    }
}

/// A local file to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    local_path: PathBuf,
    folder_id: Option<String>,
}

impl UploadRequest {
    /// Create a request for `local_path`, optionally inside `folder_id`.
    pub fn new(local_path: impl Into<PathBuf>, folder_id: Option<&str>) -> Self {
        Self {
            local_path: local_path.into(),
            folder_id: folder_id.map(str::to_string),
        }
    }

    /// Local path of the file.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Destination folder, if any.
    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    /// Base name the remote file will be tagged with.
    ///
    /// # Errors
    /// - Path has no final component or it is not valid UTF-8
    pub fn file_name(&self) -> Result<&str> {
        self.local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Path has no usable file name: {}",
                    self.local_path.display()
                ))
            })
    }

    /// Check that the local file exists and is a regular file.
    ///
    /// Returns its size in bytes.
    pub fn validate(&self) -> Result<u64> {
        let meta = std::fs::metadata(&self.local_path).map_err(|e| {
            Error::InvalidInput(format!(
                "Cannot read {}: {}",
                self.local_path.display(),
                e
            ))
        })?;

        if !meta.is_file() {
            return Err(Error::InvalidInput(format!(
                "Not a regular file: {}",
                self.local_path.display()
            )));
        }

        Ok(meta.len())
    }
}

/// A remote file to be written to a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    file_id: String,
    save_path: PathBuf,
}

impl DownloadRequest {
    /// Create a request to save `file_id` at `save_path`.
    pub fn new(file_id: impl Into<String>, save_path: impl Into<PathBuf>) -> Self {
        Self {
            file_id: file_id.into(),
            save_path: save_path.into(),
        }
    }

    /// Remote identifier.
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Local destination.
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Check that the id is non-empty and the destination directory exists.
    pub fn validate(&self) -> Result<()> {
        if self.file_id.is_empty() {
            return Err(Error::InvalidInput("File id cannot be empty".to_string()));
        }

        let parent = match self.save_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        if !parent.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Destination directory does not exist: {}",
                parent.display()
            )));
        }

        Ok(())
    }
}
