//! Carrier credential cache.
//!
//! Lazily fetches a credential from its source and refreshes only once the
//! cached one has expired. The cache is an injected object owned by the
//! carrier client, and expiry checks take an explicit `now`, so tests drive
//! the clock deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential refresh failed: {0}")]
    Refresh(String),
}

/// An API credential with an optional expiry. Plain API keys never expire.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

/// Where fresh credentials come from (static key, OAuth exchange, ...).
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<Credential, AuthError>;
}

/// A fixed API key, as used for the carrier account.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn fetch(&self) -> Result<Credential, AuthError> {
        Ok(Credential {
            token: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Lazily-initialized credential holder, refreshed only on expiry.
pub struct CredentialCache {
    source: Box<dyn TokenSource>,
    cached: RwLock<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Current token, refreshing via the source if absent or expired.
    pub async fn token(&self) -> Result<String, AuthError> {
        self.token_at(Utc::now()).await
    }

    /// Same as [`token`](Self::token) with the clock supplied by the caller.
    pub async fn token_at(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        if let Some(credential) = self.cached.read().await.as_ref() {
            if !credential.expired_at(now) {
                return Ok(credential.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(credential) = slot.as_ref() {
            if !credential.expired_at(now) {
                return Ok(credential.token.clone());
            }
        }

        let fresh = self.source.fetch().await?;
        info!(
            "Refreshed carrier credential (expires: {:?})",
            fresh.expires_at
        );
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}
