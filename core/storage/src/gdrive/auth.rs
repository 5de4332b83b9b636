//! Service-account authentication for Google Drive.

use async_trait::async_trait;
use std::path::Path;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::ServiceAccountAuthenticator;

use cloudbridge_common::{Error, Result};

use crate::token::{AccessToken, TokenSource};

/// Exchanges a service-account key for bearer tokens.
///
/// The underlying authenticator keeps issued tokens in memory and reuses
/// them until they expire; nothing is written to disk.
pub struct ServiceAccountAuth {
    authenticator: DefaultAuthenticator,
    scopes: Vec<String>,
}

impl ServiceAccountAuth {
    /// Load a service-account key file and prepare an authenticator.
    ///
    /// # Errors
    /// - `CredentialFileMissing` if `path` does not exist
    /// - `Configuration` if the key cannot be read or parsed
    pub async fn from_key_file(path: impl AsRef<Path>, scopes: Vec<String>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::CredentialFileMissing(path.to_path_buf()));
        }

        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| {
                Error::Configuration(format!(
                    "Invalid service account key {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::debug!(client_email = %key.client_email, "Loaded service account key");

        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| {
                Error::Configuration(format!("Failed to build service account authenticator: {}", e))
            })?;

        Ok(Self {
            authenticator,
            scopes,
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<AccessToken> {
        let token = self
            .authenticator
            .token(self.scopes.as_slice())
            .await
            .map_err(|e| Error::TokenAcquisitionFailed(e.to_string()))?;

        token.token().map(AccessToken::new).ok_or_else(|| {
            Error::TokenAcquisitionFailed("Token response contained no access token".to_string())
        })
    }
}
