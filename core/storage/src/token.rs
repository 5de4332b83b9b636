//! Bearer credentials and the sources that issue them.

use async_trait::async_trait;
use std::fmt;
use zeroize::Zeroizing;

use cloudbridge_common::Result;

/// An opaque bearer token. The secret is wiped from memory on drop.
#[derive(Clone)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// The raw token string.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Issues bearer tokens for a backend.
///
/// Clients ask for a token once per logical operation and never hold on to
/// it afterwards. Implementations decide whether anything is cached.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a token valid for the calls of one operation.
    async fn access_token(&self) -> Result<AccessToken>;
}

/// A token that was acquired elsewhere.
#[derive(Debug, Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
    /// Wrap an already-acquired token string.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(AccessToken::new(secret))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<AccessToken> {
        Ok(self.0.clone())
    }
}
