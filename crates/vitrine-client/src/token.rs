//! Access-token cache.
//!
//! One [`TokenCache`] per client holds at most one bearer token. A token is
//! reused until one minute before the lifetime the server declared, then
//! replaced in place by a fresh client-credentials grant. Concurrent callers
//! that find the token expired wait on the same refresh instead of issuing
//! their own.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use vitrine_core::{Error, Result};

use crate::config::TargetConfig;

/// Seconds shaved off the declared lifetime so a token is never used during
/// its last minute of validity.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
  pub value:      String,
  pub expires_at: DateTime<Utc>,
}

impl AccessToken {
  /// A token issued at `issued_at` with the server's declared lifetime.
  pub fn issued(value: String, issued_at: DateTime<Utc>, expires_in_secs: i64) -> Self {
    let usable = TimeDelta::try_seconds(expires_in_secs.saturating_sub(EXPIRY_MARGIN_SECS))
      .unwrap_or_else(TimeDelta::zero);
    Self {
      value,
      expires_at: issued_at.checked_add_signed(usable).unwrap_or(issued_at),
    }
  }

  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool { now < self.expires_at }
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
  expires_in:   i64,
}

/// Lazily refreshed bearer credential.
pub struct TokenCache {
  http:   Client,
  config: Arc<TargetConfig>,
  cached: Mutex<Option<AccessToken>>,
}

impl TokenCache {
  pub fn new(http: Client, config: Arc<TargetConfig>) -> Self {
    Self {
      http,
      config,
      cached: Mutex::new(None),
    }
  }

  /// The cached token if still valid, otherwise a freshly issued one.
  pub async fn access_token(&self) -> Result<String> {
    let mut cached = self.cached.lock().await;
    if let Some(token) = cached.as_ref()
      && token.is_valid_at(Utc::now())
    {
      return Ok(token.value.clone());
    }

    let token = self.request_token().await?;
    tracing::debug!(expires_at = %token.expires_at, "issued new access token");
    let value = token.value.clone();
    *cached = Some(token);
    Ok(value)
  }

  /// Drop the cached token so the next call requests a new one.
  pub async fn invalidate(&self) { *self.cached.lock().await = None; }

  async fn request_token(&self) -> Result<AccessToken> {
    let form = [
      ("client_id", self.config.client_id.as_str()),
      ("client_secret", self.config.client_secret.as_str()),
      ("grant_type", "client_credentials"),
      ("scope", self.config.api_scope.as_str()),
    ];

    let issued_at = Utc::now();
    let resp = self
      .http
      .post(&self.config.token_url)
      .form(&form)
      .send()
      .await
      .map_err(|e| Error::Auth(format!("token request failed: {e}")))?;

    let status = resp.status();
    let body = resp
      .text()
      .await
      .map_err(|e| Error::Auth(format!("reading token response: {e}")))?;
    if !status.is_success() {
      return Err(Error::Auth(format!("token endpoint returned {status}: {body}")));
    }

    let parsed: TokenResponse = serde_json::from_str(&body)
      .map_err(|e| Error::Auth(format!("malformed token response: {e}")))?;
    if parsed.access_token.is_empty() {
      return Err(Error::Auth("token response has an empty access_token".to_owned()));
    }

    Ok(AccessToken::issued(parsed.access_token, issued_at, parsed.expires_in))
  }
}
