//! Microsoft Graph drive client.

use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Body, Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use url::Url;

use cloudbridge_common::{DownloadRequest, Error, FileRecord, Result, UploadRequest};

use super::auth::ClientCredentialsAuth;
use super::config::OneDriveConfig;
use super::item::{ChildrenPage, DriveItem, Site, UploadSession};
use crate::http::{build_client, read_json, status_and_body};
use crate::token::TokenSource;

/// Largest file sent with a single `PUT .../content`.
const SIMPLE_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;

/// Upload session chunk size (must be a multiple of 320KB).
const SESSION_CHUNK_SIZE: usize = 10 * 320 * 1024;

/// Characters escaped in a drive path segment; unreserved ones stay literal.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Normalise `path` to `/a/b` form with each segment encoded.
///
/// Returns an empty string for the drive root.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/{}", encode_segment(segment)))
        .collect()
}

/// Address of a named child, relative to the drive: `items/{id}:/{name}:`
/// or `root:/{name}:`.
fn child_address(name: &str, folder_id: Option<&str>) -> String {
    match folder_id {
        Some(folder) => format!("items/{}:/{}:", folder, encode_segment(name)),
        None => format!("root:/{}:", encode_segment(name)),
    }
}

/// Microsoft Graph client for one drive.
pub struct GraphClient {
    http: Client,
    config: OneDriveConfig,
    token_source: Arc<dyn TokenSource>,
}

impl GraphClient {
    /// Create a client that takes its tokens from `token_source`.
    pub fn new(config: OneDriveConfig, token_source: Arc<dyn TokenSource>) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            config,
            token_source,
        })
    }

    /// Create a client authenticated with the configured app credentials.
    pub fn connect(config: OneDriveConfig) -> Result<Self> {
        let auth = ClientCredentialsAuth::new(&config)?;
        Self::new(config, Arc::new(auth))
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        Ok(self.token_source.access_token().await?.bearer())
    }

    fn base(&self) -> &str {
        self.config.graph_base.trim_end_matches('/')
    }

    /// URL of `rest` inside the configured drive.
    fn drive_url(&self, rest: &str) -> String {
        format!("{}/{}/{}", self.base(), self.config.drive.path(), rest)
    }

    /// Upload a local file into `folder_id`, or the drive root.
    ///
    /// Files up to 4MB go up in one request; larger ones through an upload
    /// session. An existing file with the same name is replaced.
    ///
    /// # Errors
    /// - `InvalidInput` if the local path is not a readable regular file
    /// - `UploadFailed` on any status other than 200/201
    pub async fn upload(
        &self,
        local_path: impl AsRef<Path>,
        folder_id: Option<&str>,
    ) -> Result<FileRecord> {
        let request = UploadRequest::new(local_path.as_ref(), folder_id);
        let total_size = request.validate()?;
        let address = child_address(request.file_name()?, request.folder_id());

        let item = if total_size <= SIMPLE_UPLOAD_LIMIT {
            self.upload_simple(&address, request.local_path(), total_size)
                .await?
        } else {
            self.upload_session(&address, request.local_path(), total_size)
                .await?
        };

        tracing::info!(id = %item.id, name = %item.name, "Uploaded file to OneDrive");
        Ok(item.into())
    }

    /// Single `PUT` streaming the file body.
    async fn upload_simple(&self, address: &str, path: &Path, total_size: u64) -> Result<DriveItem> {
        let url = self.drive_url(&format!("{}/content", address));
        let auth = self.auth_header().await?;
        let file = tokio::fs::File::open(path).await?;

        let response = self
            .http
            .put(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, total_size.to_string())
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        self.upload_outcome(response)
            .await?
            .ok_or_else(|| Error::UploadFailed {
                status: StatusCode::ACCEPTED.as_u16(),
                body: "Upload accepted but not completed".to_string(),
            })
    }

    /// Create an upload session and send the file in ranged chunks.
    async fn upload_session(
        &self,
        address: &str,
        path: &Path,
        total_size: u64,
    ) -> Result<DriveItem> {
        let url = self.drive_url(&format!("{}/createUploadSession", address));
        let auth = self.auth_header().await?;

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .json(&serde_json::json!({
                "item": { "@microsoft.graph.conflictBehavior": "replace" }
            }))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create upload session: {}", e)))?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(Error::UploadFailed { status, body });
        }

        let session: UploadSession = read_json(response).await?;
        tracing::debug!(total_size, "Created upload session");

        let mut file = tokio::fs::File::open(path).await?;
        let mut buffer = Vec::with_capacity(SESSION_CHUNK_SIZE);
        let mut offset = 0u64;

        loop {
            buffer.clear();
            let read = (&mut file)
                .take(SESSION_CHUNK_SIZE as u64)
                .read_to_end(&mut buffer)
                .await?;

            if read == 0 {
                break;
            }

            let end = offset + read as u64 - 1;
            let content_range = format!("bytes {}-{}/{}", offset, end, total_size);
            tracing::debug!(%content_range, "Uploading chunk");

            // The session URL is pre-authenticated; no bearer header.
            let response = self
                .http
                .put(&session.upload_url)
                .header(header::CONTENT_LENGTH, read.to_string())
                .header(header::CONTENT_RANGE, content_range)
                .body(buffer.clone())
                .send()
                .await
                .map_err(|e| Error::Network(format!("Failed to upload chunk: {}", e)))?;

            offset += read as u64;

            if let Some(item) = self.upload_outcome(response).await? {
                return Ok(item);
            }
        }

        Err(Error::Network("Upload did not complete".to_string()))
    }

    /// `Some(item)` on 200/201, `None` on 202, `UploadFailed` otherwise.
    async fn upload_outcome(&self, response: reqwest::Response) -> Result<Option<DriveItem>> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => read_json(response).await.map(Some),
            StatusCode::ACCEPTED => Ok(None),
            _ => {
                let (status, body) = status_and_body(response).await;
                Err(Error::UploadFailed { status, body })
            }
        }
    }

    /// Stream the content of `item_id` into `save_path`.
    ///
    /// The destination is only created once the server has answered with a
    /// success status; chunks are written as they arrive.
    ///
    /// # Errors
    /// - `InvalidInput` if the destination directory does not exist
    /// - `DownloadFailed` on a non-success response
    pub async fn download(&self, item_id: &str, save_path: impl AsRef<Path>) -> Result<()> {
        let request = DownloadRequest::new(item_id, save_path.as_ref());
        request.validate()?;

        let url = self.drive_url(&format!("items/{}/content", request.file_id()));
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to download file: {}", e)))?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(Error::DownloadFailed { status, body });
        }

        let mut file = tokio::fs::File::create(request.save_path()).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Network(format!("Stream read error: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;

        tracing::info!(
            path = %request.save_path().display(),
            bytes = written,
            "Downloaded file"
        );
        Ok(())
    }

    /// List the immediate children of `folder_id`, or of the drive root.
    ///
    /// Items are returned in the order the service sends them, following
    /// `@odata.nextLink` across pages.
    pub async fn list(&self, folder_id: Option<&str>) -> Result<Vec<FileRecord>> {
        let url = match folder_id {
            Some(id) => self.drive_url(&format!("items/{}/children", id)),
            None => self.drive_url("root/children"),
        };

        let items = self.children(url).await?;
        for item in &items {
            tracing::debug!(id = %item.id, name = %item.name, folder = item.is_folder(), "Listed item");
        }

        Ok(items.into_iter().map(FileRecord::from).collect())
    }

    /// Find the id of the first folder among the children of `path` in a
    /// SharePoint site's default drive.
    ///
    /// Returns `None` when the listing has no folder entries.
    pub async fn resolve_folder_by_path(&self, site_id: &str, path: &str) -> Result<Option<String>> {
        let encoded = encode_path(path);
        let url = if encoded.is_empty() {
            format!("{}/sites/{}/drive/root/children", self.base(), site_id)
        } else {
            format!(
                "{}/sites/{}/drive/root:{}:/children",
                self.base(),
                site_id,
                encoded
            )
        };

        let folder = self
            .children(url)
            .await?
            .into_iter()
            .find(DriveItem::is_folder);

        match &folder {
            Some(item) => tracing::debug!(id = %item.id, name = %item.name, "Resolved folder"),
            None => tracing::debug!(%path, "No folder found"),
        }

        Ok(folder.map(|item| item.id))
    }

    /// Resolve a site lookup URL such as
    /// `https://graph.microsoft.com/v1.0/sites/{host}:/sites/{name}` to the
    /// site's opaque id.
    ///
    /// # Errors
    /// - `InvalidInput` if the URL does not parse
    /// - `MalformedResponse` if the response has no `id`
    pub async fn resolve_site_id(&self, site_lookup_url: &str) -> Result<String> {
        let url = Url::parse(site_lookup_url)
            .map_err(|e| Error::InvalidInput(format!("Invalid site lookup URL: {}", e)))?;
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to resolve site: {}", e)))?;

        let site: Site = self.handle_response(response).await?;
        tracing::debug!(site_id = %site.id, "Resolved site");
        Ok(site.id)
    }

    /// Collect every page of a `children` listing starting at `url`.
    async fn children(&self, url: String) -> Result<Vec<DriveItem>> {
        let auth = self.auth_header().await?;
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next {
            let response = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, &auth)
                .send()
                .await
                .map_err(|e| Error::Network(format!("Failed to list children: {}", e)))?;

            let page: ChildrenPage = self.handle_response(response).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            read_json(response).await
        } else {
            let (status, body) = status_and_body(response).await;
            Err(Error::Transport { status, body })
        }
    }
}
