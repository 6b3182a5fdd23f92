use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    prelude::*,
};

/// Access and refresh token pair of an authenticated session.
#[must_use]
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("expires_at", &self.expires_at()).finish_non_exhaustive()
    }
}

impl Credential {
    /// Expiry claim of the access token, `None` if the token cannot be decoded.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        /// `exp` is a NumericDate, which may carry a fraction.
        #[derive(Deserialize)]
        struct Claims {
            exp: f64,
        }

        let payload = self.access_token.split('.').nth(1)?;
        let payload = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims = serde_json::from_slice::<Claims>(&payload).ok()?;
        #[allow(clippy::cast_possible_truncation)]
        let exp = claims.exp.trunc() as i64;
        DateTime::from_timestamp(exp, 0)
    }

    /// Undecodable tokens are considered expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: TimeDelta) -> bool {
        self.expires_at().is_none_or(|expires_at| expires_at <= now + leeway)
    }

    #[must_use]
    pub fn is_expired(&self, leeway: TimeDelta) -> bool {
        self.is_expired_at(Utc::now(), leeway)
    }
}

#[must_use]
pub struct RefreshedToken {
    pub access_token: String,

    /// Replacement refresh token, if the backend rotates them.
    pub refresh_token: Option<String>,
}

#[async_trait]
pub trait TokenRefresher: Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken>;
}

/// Owns the credential and keeps the access token fresh.
///
/// Refreshes are serialized: concurrent callers wait for the refresh in flight
/// and then pick up its token.
///
/// A token checked as valid may still expire before the backend sees it.
/// The leeway narrows that window but does not close it.
pub struct Session<R> {
    refresher: R,
    credential: Mutex<Option<Credential>>,
    expiry_leeway: TimeDelta,
}

impl<R: TokenRefresher> Session<R> {
    pub fn new(refresher: R, credential: Option<Credential>, expiry_leeway: TimeDelta) -> Self {
        Self { refresher, credential: Mutex::new(credential), expiry_leeway }
    }

    pub async fn set(&self, credential: Credential) {
        *self.credential.lock().await = Some(credential);
    }

    pub async fn clear(&self) {
        *self.credential.lock().await = None;
    }

    pub async fn credential(&self) -> Option<Credential> {
        self.credential.lock().await.clone()
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Any failure drops the credential and turns into [`Error::AuthExpired`].
    pub async fn refresh(&self) -> Result<Credential> {
        let mut credential = self.credential.lock().await;
        self.refresh_locked(&mut credential).await
    }

    /// Access token to send right now, refreshed beforehand if it has expired.
    pub async fn current_access_token(&self) -> Result<String> {
        let mut credential = self.credential.lock().await;
        let current = credential.as_ref().ok_or(Error::Unauthenticated)?;
        if !current.is_expired(self.expiry_leeway) {
            return Ok(current.access_token.clone());
        }
        Ok(self.refresh_locked(&mut credential).await?.access_token)
    }

    #[instrument(skip_all)]
    async fn refresh_locked(&self, slot: &mut Option<Credential>) -> Result<Credential> {
        let Some(current) = slot.as_ref() else {
            return Err(Error::Unauthenticated);
        };
        info!(expired_at = ?current.expires_at(), "refreshing the access token…");
        match self.refresher.refresh(&current.refresh_token).await {
            Ok(refreshed) => {
                let credential = Credential {
                    refresh_token: refreshed
                        .refresh_token
                        .unwrap_or_else(|| current.refresh_token.clone()),
                    access_token: refreshed.access_token,
                };
                info!(expires_at = ?credential.expires_at(), "refreshed");
                *slot = Some(credential.clone());
                Ok(credential)
            }
            Err(error) => {
                warn!("refresh failed, dropping the session: {error:#}");
                *slot = None;
                Err(if error.is_auth_expired() { error } else { Error::auth_expired(error) })
            }
        }
    }
}
