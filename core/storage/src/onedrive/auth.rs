//! Client-credentials authentication for Microsoft Graph.

use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{AuthType, ClientId, ClientSecret, RequestTokenError, Scope, TokenResponse, TokenUrl};

use cloudbridge_common::{Error, Result};

use super::config::OneDriveConfig;
use crate::token::{AccessToken, TokenSource};

/// Scope granting the application's configured Graph permissions.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Acquires app-only Graph tokens with the client-credentials grant.
///
/// Every call to [`TokenSource::access_token`] performs a fresh exchange;
/// nothing is cached or refreshed in the background.
pub struct ClientCredentialsAuth {
    client_id: ClientId,
    client_secret: ClientSecret,
    token_url: TokenUrl,
    http: oauth2::reqwest::Client,
}

impl ClientCredentialsAuth {
    /// Create an authenticator for the tenant in `config`.
    ///
    /// # Errors
    /// - `Configuration` if an identifier or the secret is empty, or the
    ///   token URL is invalid
    pub fn new(config: &OneDriveConfig) -> Result<Self> {
        for (field, value) in [
            ("client id", &config.client_id),
            ("tenant id", &config.tenant_id),
            ("client secret", &config.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("Missing {}", field)));
            }
        }

        let token_url = TokenUrl::new(config.token_url())
            .map_err(|e| Error::Configuration(format!("Invalid token URL: {}", e)))?;

        let http = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        if let Some(path) = &config.token_cache_path {
            tracing::debug!(
                path = %path.display(),
                "Token cache path is set but tokens are not persisted"
            );
        }

        Ok(Self {
            client_id: ClientId::new(config.client_id.clone()),
            client_secret: ClientSecret::new(config.client_secret.clone()),
            token_url,
            http,
        })
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsAuth {
    async fn access_token(&self) -> Result<AccessToken> {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(self.token_url.clone());

        let token = client
            .exchange_client_credentials()
            .add_scope(Scope::new(GRAPH_SCOPE.to_string()))
            .request_async(&self.http)
            .await
            .map_err(token_error)?;

        tracing::debug!("Acquired Graph access token");
        Ok(AccessToken::new(token.access_token().secret().clone()))
    }
}

/// Map a failed exchange to `TokenAcquisitionFailed`, keeping the
/// provider's `error_description` when there is one.
fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> Error
where
    RE: std::error::Error + 'static,
{
    let message = match err {
        RequestTokenError::ServerResponse(response) => response
            .error_description()
            .cloned()
            .unwrap_or_else(|| response.error().to_string()),
        RequestTokenError::Parse(parse_err, body) => description_from_body(&body)
            .unwrap_or_else(|| format!("Unexpected token response: {}", parse_err)),
        RequestTokenError::Request(e) => format!("Token request failed: {}", e),
        RequestTokenError::Other(message) => message,
    };

    Error::TokenAcquisitionFailed(message)
}

/// Pull `error_description` (or `error`) out of a raw token response body.
fn description_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("error_description")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
