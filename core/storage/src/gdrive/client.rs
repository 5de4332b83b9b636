//! Google Drive API client.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use cloudbridge_common::{DownloadRequest, Error, FileRecord, Result, UploadRequest};

use super::auth::ServiceAccountAuth;
use super::config::GDriveConfig;
use super::query::DriveQuery;
use crate::http::{build_client, read_json, status_and_body};
use crate::token::TokenSource;

/// Chunk size for resumable uploads (must be a multiple of 256KB).
const CHUNK_SIZE: usize = 32 * 256 * 1024; // 8MB

/// Fields requested for a single file resource.
const FILE_FIELDS: &str = "id,name,mimeType,webViewLink,size,modifiedTime";
/// Fields requested for a page of search results.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,webViewLink,size,modifiedTime)";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Browser link.
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// File size in bytes (only for files, not folders).
    #[serde(default)]
    pub size: Option<String>,
    /// Modified time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

impl From<DriveFile> for FileRecord {
    fn from(file: DriveFile) -> Self {
        let is_folder = file.is_folder();
        let size = file.size_bytes();
        FileRecord {
            id: file.id,
            name: file.name,
            web_link: file.web_view_link,
            download_link: None,
            is_folder,
            size,
            modified: file.modified_time,
        }
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Metadata sent when creating a file.
fn upload_metadata(name: &str, folder_id: Option<&str>) -> serde_json::Value {
    let mut metadata = serde_json::json!({ "name": name });

    if let Some(parent) = folder_id {
        metadata["parents"] = serde_json::json!([parent]);
    }

    metadata
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    config: GDriveConfig,
    token_source: Arc<dyn TokenSource>,
}

impl DriveClient {
    /// Create a client that takes its tokens from `token_source`.
    pub fn new(config: GDriveConfig, token_source: Arc<dyn TokenSource>) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            config,
            token_source,
        })
    }

    /// Create a client authenticated with the configured service-account key.
    ///
    /// # Errors
    /// - `CredentialFileMissing` if the key file does not exist
    /// - `Configuration` if the key is unusable
    pub async fn connect(config: GDriveConfig) -> Result<Self> {
        let auth =
            ServiceAccountAuth::from_key_file(&config.credentials_path, config.scopes.clone())
                .await?;
        Self::new(config, Arc::new(auth))
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        Ok(self.token_source.access_token().await?.bearer())
    }

    /// Upload a local file, optionally into `folder_id`.
    ///
    /// The file is tagged with its base name and sent through a resumable
    /// upload session in fixed-size chunks. Every call creates a new remote
    /// file, even if one with the same name already exists.
    ///
    /// # Errors
    /// - `InvalidInput` if the local path is not a readable regular file
    /// - `UploadFailed` on any non-success response
    pub async fn upload(
        &self,
        local_path: impl AsRef<Path>,
        folder_id: Option<&str>,
    ) -> Result<FileRecord> {
        let request = UploadRequest::new(local_path.as_ref(), folder_id);
        let total_size = request.validate()?;
        let metadata = upload_metadata(request.file_name()?, request.folder_id());

        let upload_uri = self.start_resumable_upload(&metadata, total_size).await?;
        let file = self
            .send_file(&upload_uri, request.local_path(), total_size)
            .await?;

        tracing::info!(id = %file.id, name = %file.name, "Uploaded file to Google Drive");
        Ok(file.into())
    }

    /// Start a resumable upload session and return its URI.
    async fn start_resumable_upload(
        &self,
        metadata: &serde_json::Value,
        total_size: u64,
    ) -> Result<String> {
        let url = format!("{}/files", self.config.upload_base);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header("X-Upload-Content-Length", total_size.to_string())
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .json(metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start resumable upload: {}", e)))?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(Error::UploadFailed { status, body });
        }

        // Extract upload URI from Location header
        let upload_uri = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| Error::MalformedResponse("No upload URI in response".to_string()))?
            .to_str()
            .map_err(|e| Error::MalformedResponse(format!("Invalid upload URI: {}", e)))?
            .to_string();

        tracing::debug!(%upload_uri, total_size, "Started resumable upload session");
        Ok(upload_uri)
    }

    /// Stream the file at `path` into an open upload session.
    async fn send_file(&self, upload_uri: &str, path: &Path, total_size: u64) -> Result<DriveFile> {
        if total_size == 0 {
            return self.finish_empty_upload(upload_uri).await;
        }

        let mut file = tokio::fs::File::open(path).await?;
        let mut buffer = Vec::with_capacity(CHUNK_SIZE);
        let mut bytes_uploaded = 0u64;

        loop {
            buffer.clear();
            let read = (&mut file)
                .take(CHUNK_SIZE as u64)
                .read_to_end(&mut buffer)
                .await?;

            if read == 0 {
                break;
            }

            let result = self
                .upload_chunk(upload_uri, &buffer, bytes_uploaded, total_size)
                .await?;

            bytes_uploaded += read as u64;

            if let Some(file) = result {
                return Ok(file);
            }
        }

        Err(Error::Network("Upload did not complete".to_string()))
    }

    /// Upload a chunk to a resumable upload session.
    async fn upload_chunk(
        &self,
        upload_uri: &str,
        data: &[u8],
        start_byte: u64,
        total_size: u64,
    ) -> Result<Option<DriveFile>> {
        let end_byte = start_byte + data.len() as u64 - 1;
        let content_range = format!("bytes {}-{}/{}", start_byte, end_byte, total_size);

        tracing::debug!(%content_range, "Uploading chunk");

        let response = self
            .http
            .put(upload_uri)
            .header(header::CONTENT_LENGTH, data.len().to_string())
            .header(header::CONTENT_RANGE, content_range)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload chunk: {}", e)))?;

        self.chunk_outcome(response).await
    }

    /// Finalise a session for a zero-byte file.
    async fn finish_empty_upload(&self, upload_uri: &str) -> Result<DriveFile> {
        let response = self
            .http
            .put(upload_uri)
            .header(header::CONTENT_LENGTH, "0")
            .header(header::CONTENT_RANGE, "bytes */0")
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload empty file: {}", e)))?;

        self.chunk_outcome(response)
            .await?
            .ok_or_else(|| Error::Network("Upload did not complete".to_string()))
    }

    /// `Some(file)` when the session completed, `None` when more bytes are expected.
    async fn chunk_outcome(&self, response: reqwest::Response) -> Result<Option<DriveFile>> {
        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            read_json(response).await.map(Some)
        } else if status == StatusCode::PERMANENT_REDIRECT {
            // 308 Resume Incomplete
            Ok(None)
        } else {
            let (status, body) = status_and_body(response).await;
            Err(Error::UploadFailed { status, body })
        }
    }

    /// Find non-trashed files named exactly `name`, optionally inside `folder_id`.
    ///
    /// Returns an empty vector when nothing matches.
    pub async fn search(&self, name: &str, folder_id: Option<&str>) -> Result<Vec<FileRecord>> {
        let mut query = DriveQuery::new().name_equals(name).not_trashed();
        if let Some(folder) = folder_id {
            query = query.in_parent(folder);
        }
        let query = query.to_string();

        let url = format!("{}/files", self.config.api_base);
        let auth = self.auth_header().await?;

        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, &auth)
                .query(&[("q", query.as_str()), ("fields", LIST_FIELDS)]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Network(format!("Failed to search files: {}", e)))?;

            let list_response: FileListResponse = self.handle_response(response).await?;
            records.extend(list_response.files.into_iter().map(FileRecord::from));

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(%query, matches = records.len(), "Search complete");
        Ok(records)
    }

    /// Download the content of `file_id` into `save_path`.
    ///
    /// Chunks are collected in memory until the transfer completes, then the
    /// file is written in one go.
    ///
    /// # Errors
    /// - `InvalidInput` if the destination directory does not exist
    /// - `DownloadFailed` on a non-success response
    pub async fn download(&self, file_id: &str, save_path: impl AsRef<Path>) -> Result<()> {
        let request = DownloadRequest::new(file_id, save_path.as_ref());
        request.validate()?;

        let url = format!("{}/files/{}", self.config.api_base, request.file_id());
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to download file: {}", e)))?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(Error::DownloadFailed { status, body });
        }

        let mut buffer = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Network(format!("Stream read error: {}", e)))?;
            buffer.extend_from_slice(&chunk);
        }

        tokio::fs::write(request.save_path(), &buffer).await?;

        tracing::info!(
            path = %request.save_path().display(),
            bytes = buffer.len(),
            "Downloaded file"
        );
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticToken;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::json;
    use tempfile::TempDir;

    fn test_client(server: &MockServer) -> DriveClient {
        let config = GDriveConfig {
            credentials_path: "/unused/sa.json".into(),
            scopes: vec![],
            api_base: server.url("/drive/v3"),
            upload_base: server.url("/upload/drive/v3"),
        };
        DriveClient::new(config, Arc::new(StaticToken::new("test-token"))).unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_upload_metadata_without_folder() {
        assert_eq!(
            upload_metadata("report.pdf", None),
            json!({ "name": "report.pdf" })
        );
    }

    #[test]
    fn test_upload_metadata_with_folder() {
        assert_eq!(
            upload_metadata("report.pdf", Some("F1")),
            json!({ "name": "report.pdf", "parents": ["F1"] })
        );
    }

    #[test]
    fn test_drive_file_to_record() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "abc",
            "name": "docs",
            "mimeType": "application/vnd.google-apps.folder",
        }))
        .unwrap();
        let record = FileRecord::from(file);
        assert!(record.is_folder);
        assert_eq!(record.size, None);
        assert_eq!(record.link(), "abc");

        let file: DriveFile = serde_json::from_value(json!({
            "id": "def",
            "name": "a.txt",
            "mimeType": "text/plain",
            "size": "12345",
            "webViewLink": "https://drive.google.com/file/d/def/view",
        }))
        .unwrap();
        let record = FileRecord::from(file);
        assert!(!record.is_folder);
        assert_eq!(record.size, Some(12345));
        assert_eq!(record.link(), "https://drive.google.com/file/d/def/view");
    }

    #[tokio::test]
    async fn test_upload_tags_name_and_parent() {
        let server = MockServer::start_async().await;
        let session_uri = server.url("/upload-session/s1");

        let start = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload/drive/v3/files")
                    .query_param("uploadType", "resumable")
                    .header("authorization", "Bearer test-token")
                    .header("x-upload-content-length", "5")
                    .json_body(json!({ "name": "report.pdf", "parents": ["F1"] }));
                then.status(200).header("Location", session_uri.as_str());
            })
            .await;

        let chunk = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/upload-session/s1")
                    .header("content-range", "bytes 0-4/5")
                    .body("hello");
                then.status(200).json_body(json!({
                    "id": "file-1",
                    "name": "report.pdf",
                    "mimeType": "application/pdf",
                    "webViewLink": "https://drive.google.com/file/d/file-1/view",
                }));
            })
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "report.pdf", b"hello");

        let record = test_client(&server).upload(&path, Some("F1")).await.unwrap();

        start.assert_async().await;
        chunk.assert_async().await;
        assert_eq!(record.name, "report.pdf");
        assert_eq!(record.id, "file-1");
        assert_eq!(record.link(), "https://drive.google.com/file/d/file-1/view");
    }

    #[tokio::test]
    async fn test_upload_without_link_falls_back_to_id() {
        let server = MockServer::start_async().await;
        let session_uri = server.url("/upload-session/s2");

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload/drive/v3/files")
                    .json_body(json!({ "name": "notes.txt" }));
                then.status(200).header("Location", session_uri.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/upload-session/s2");
                then.status(201)
                    .json_body(json!({ "id": "file-2", "name": "notes.txt" }));
            })
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.txt", b"some notes");

        let record = test_client(&server).upload(&path, None).await.unwrap();
        assert_eq!(record.name, "notes.txt");
        assert_eq!(record.link(), "file-2");
    }

    #[tokio::test]
    async fn test_upload_in_multiple_chunks() {
        let server = MockServer::start_async().await;
        let session_uri = server.url("/upload-session/big");
        let total = CHUNK_SIZE + 3;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/upload/drive/v3/files");
                then.status(200).header("Location", session_uri.as_str());
            })
            .await;

        let first_range = format!("bytes 0-{}/{}", CHUNK_SIZE - 1, total);
        let first = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/upload-session/big")
                    .header("content-range", first_range.as_str());
                then.status(308);
            })
            .await;

        let last_range = format!("bytes {}-{}/{}", CHUNK_SIZE, total - 1, total);
        let last = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/upload-session/big")
                    .header("content-range", last_range.as_str())
                    .body("xyz");
                then.status(200)
                    .json_body(json!({ "id": "big-1", "name": "big.bin" }));
            })
            .await;

        let dir = TempDir::new().unwrap();
        let mut contents = vec![0u8; CHUNK_SIZE];
        contents.extend_from_slice(b"xyz");
        let path = write_file(&dir, "big.bin", &contents);

        let record = test_client(&server).upload(&path, None).await.unwrap();

        first.assert_async().await;
        last.assert_async().await;
        assert_eq!(record.id, "big-1");
    }

    #[tokio::test]
    async fn test_upload_empty_file() {
        let server = MockServer::start_async().await;
        let session_uri = server.url("/upload-session/empty");

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload/drive/v3/files")
                    .header("x-upload-content-length", "0");
                then.status(200).header("Location", session_uri.as_str());
            })
            .await;
        let finish = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/upload-session/empty")
                    .header("content-range", "bytes */0");
                then.status(200)
                    .json_body(json!({ "id": "e-1", "name": "empty.txt" }));
            })
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");

        let record = test_client(&server).upload(&path, None).await.unwrap();
        finish.assert_async().await;
        assert_eq!(record.name, "empty.txt");
    }

    #[tokio::test]
    async fn test_upload_failure_carries_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/upload/drive/v3/files");
                then.status(403).body("{\"error\":\"storageQuotaExceeded\"}");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "report.pdf", b"hello");

        let err = test_client(&server).upload(&path, None).await.unwrap_err();
        match err {
            Error::UploadFailed { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("storageQuotaExceeded"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().unwrap();

        let err = test_client(&server)
            .upload(dir.path().join("missing.pdf"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_search_single_match() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .header("authorization", "Bearer test-token")
                    .query_param("q", "name = 'report.pdf' and trashed = false");
                then.status(200).json_body(json!({
                    "files": [{
                        "id": "file-1",
                        "name": "report.pdf",
                        "webViewLink": "https://drive.google.com/file/d/file-1/view",
                    }]
                }));
            })
            .await;

        let records = test_client(&server).search("report.pdf", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "file-1");
        assert_eq!(records[0].name, "report.pdf");
        assert_eq!(
            records[0].web_link.as_deref(),
            Some("https://drive.google.com/file/d/file-1/view")
        );
    }

    #[tokio::test]
    async fn test_search_follows_page_token() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .query_param("q", "name = 'report.pdf' and trashed = false")
                    .query_param_missing("pageToken");
                then.status(200).json_body(json!({
                    "files": [{ "id": "a", "name": "report.pdf" }],
                    "nextPageToken": "tok2",
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .query_param("q", "name = 'report.pdf' and trashed = false")
                    .query_param("pageToken", "tok2");
                then.status(200).json_body(json!({
                    "files": [{ "id": "b", "name": "report.pdf" }],
                }));
            })
            .await;

        let records = test_client(&server).search("report.pdf", None).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_search_no_match_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .query_param(
                        "q",
                        "name = 'missing.pdf' and trashed = false and 'F1' in parents",
                    );
                then.status(200).json_body(json!({ "files": [] }));
            })
            .await;

        let records = test_client(&server)
            .search("missing.pdf", Some("F1"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_search_escapes_quotes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .query_param("q", r"name = 'it\'s.txt' and trashed = false");
                then.status(200).json_body(json!({ "files": [] }));
            })
            .await;

        test_client(&server).search("it's.txt", None).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_malformed_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/drive/v3/files");
                then.status(200).json_body(json!({ "files": [{ "name": "no-id" }] }));
            })
            .await;

        let err = test_client(&server).search("no-id", None).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_download_round_trip() {
        let server = MockServer::start_async().await;
        let contents: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files/file-1")
                    .query_param("alt", "media")
                    .header("authorization", "Bearer test-token");
                then.status(200).body(contents.clone());
            })
            .await;

        let dir = TempDir::new().unwrap();
        let save_path = dir.path().join("out.bin");

        test_client(&server)
            .download("file-1", &save_path)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&save_path).unwrap(), contents);
    }

    #[tokio::test]
    async fn test_download_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/drive/v3/files/gone");
                then.status(404).body("File not found: gone");
            })
            .await;

        let dir = TempDir::new().unwrap();
        let save_path = dir.path().join("out.bin");

        let err = test_client(&server)
            .download("gone", &save_path)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, Error::DownloadFailed { .. }));
        assert!(!save_path.exists());
    }
}
