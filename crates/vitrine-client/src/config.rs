//! Connection settings for the remote platform.

use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str = "https://ims-na1.adobelogin.com/ims/token/v3";
pub const DEFAULT_BASE_URL: &str = "https://mc.adobe.io";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and endpoints. All values are opaque to the client.
#[derive(Debug, Clone)]
pub struct TargetConfig {
  pub tenant_id:     String,
  pub client_id:     String,
  pub client_secret: String,
  pub api_key:       String,
  pub api_scope:     String,
  /// Client-credentials token endpoint.
  pub token_url:     String,
  /// API host; requests go to `{base_url}/{tenant_id}/target/...`.
  pub base_url:      String,
  pub timeout:       Duration,
}

impl TargetConfig {
  pub fn new(
    tenant_id: impl Into<String>,
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    api_key: impl Into<String>,
    api_scope: impl Into<String>,
  ) -> Self {
    Self {
      tenant_id:     tenant_id.into(),
      client_id:     client_id.into(),
      client_secret: client_secret.into(),
      api_key:       api_key.into(),
      api_scope:     api_scope.into(),
      token_url:     DEFAULT_TOKEN_URL.to_owned(),
      base_url:      DEFAULT_BASE_URL.to_owned(),
      timeout:       DEFAULT_TIMEOUT,
    }
  }

  #[must_use]
  pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
    self.token_url = url.into();
    self
  }

  #[must_use]
  pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
    self.base_url = url.into().trim_end_matches('/').to_owned();
    self
  }

  #[must_use]
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Full URL of a tenant-scoped API path such as `/activities`.
  pub fn api_url(&self, path: &str) -> String {
    format!(
      "{}/{}/target{}",
      self.base_url.trim_end_matches('/'),
      self.tenant_id,
      path
    )
  }
}
