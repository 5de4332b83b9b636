//! Response handling shared by both backends.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use cloudbridge_common::{Error, Result};

const USER_AGENT: &str = concat!("cloudbridge/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client owned by one backend client handle.
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Deserialize a successful response body.
///
/// A body that does not match `T` is a [`Error::MalformedResponse`], so a
/// missing `id` never surfaces as a panic or a generic parse error.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))?;

    Ok(serde_json::from_slice(&bytes)?)
}

/// Drain a failed response into its status code and body text.
pub(crate) async fn status_and_body(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
