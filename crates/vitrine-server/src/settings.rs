//! Process configuration.
//!
//! An optional TOML file is layered under the process environment, so
//! `TENANT_ID=...` overrides `tenant_id = "..."` from the file.

use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use vitrine_automation::DEFAULT_CAMPAIGN_MARKER;
use vitrine_client::TargetConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to load configuration: {0}")]
  Load(#[from] ConfigError),

  #[error("missing required configuration: {}", .0.join(", "))]
  Missing(Vec<&'static str>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub tenant_id:            Option<String>,
  pub client_id:            Option<String>,
  pub client_secret:        Option<String>,
  pub api_key:              Option<String>,
  pub api_scope:            Option<String>,
  #[serde(default = "default_host")]
  pub api_host:             String,
  #[serde(default = "default_port")]
  pub api_port:             u16,
  pub ims_token_url:        Option<String>,
  pub target_base_url:      Option<String>,
  #[serde(default = "default_marker")]
  pub campaign_marker:      String,
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 3001 }

fn default_marker() -> String { DEFAULT_CAMPAIGN_MARKER.to_owned() }

fn default_timeout_secs() -> u64 { 30 }

impl Settings {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let config = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(Environment::default())
      .build()?;
    Self::from_config(config)
  }

  fn from_config(config: Config) -> Result<Self, SettingsError> { Ok(config.try_deserialize()?) }

  pub fn address(&self) -> String { format!("{}:{}", self.api_host, self.api_port) }

  /// Client configuration, or every missing credential at once.
  pub fn target_config(&self) -> Result<TargetConfig, SettingsError> {
    let required = [
      ("TENANT_ID", &self.tenant_id),
      ("CLIENT_ID", &self.client_id),
      ("CLIENT_SECRET", &self.client_secret),
      ("API_KEY", &self.api_key),
      ("API_SCOPE", &self.api_scope),
    ];
    let missing: Vec<&'static str> = required
      .iter()
      .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
      .map(|(key, _)| *key)
      .collect();
    if !missing.is_empty() {
      return Err(SettingsError::Missing(missing));
    }

    let value = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_owned();
    let mut target = TargetConfig::new(
      value(&self.tenant_id),
      value(&self.client_id),
      value(&self.client_secret),
      value(&self.api_key),
      value(&self.api_scope),
    )
    .with_timeout(Duration::from_secs(self.request_timeout_secs));
    if let Some(url) = self.ims_token_url.as_deref().filter(|u| !u.trim().is_empty()) {
      target = target.with_token_url(url.trim());
    }
    if let Some(url) = self.target_base_url.as_deref().filter(|u| !u.trim().is_empty()) {
      target = target.with_base_url(url.trim());
    }
    Ok(target)
  }
}

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn from_toml(toml: &str) -> Settings {
    let config = Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap();
    Settings::from_config(config).unwrap()
  }

  #[test]
  fn defaults_apply_to_optional_keys() {
    let settings = from_toml("");
    assert_eq!(settings.address(), "0.0.0.0:3001");
    assert_eq!(settings.campaign_marker, "Trava Telas");
    assert_eq!(settings.request_timeout_secs, 30);
  }

  #[test]
  fn every_missing_credential_is_reported() {
    let settings = from_toml(
      r#"
        tenant_id = "acme"
        client_id = "  "
        api_key   = "key"
      "#,
    );
    let err = settings.target_config().unwrap_err();
    assert!(matches!(
      &err,
      SettingsError::Missing(keys) if keys == &["CLIENT_ID", "CLIENT_SECRET", "API_SCOPE"]
    ));
    assert_eq!(
      err.to_string(),
      "missing required configuration: CLIENT_ID, CLIENT_SECRET, API_SCOPE"
    );
  }

  #[test]
  fn complete_settings_build_a_client_config() {
    let settings = from_toml(
      r#"
        tenant_id            = "acme"
        client_id            = "id"
        client_secret        = "secret"
        api_key              = "key"
        api_scope            = "openid,AdobeID"
        api_port             = 8080
        target_base_url      = "http://localhost:9999"
        request_timeout_secs = 5
      "#,
    );
    assert_eq!(settings.address(), "0.0.0.0:8080");

    let target = settings.target_config().unwrap();
    assert_eq!(target.tenant_id, "acme");
    assert_eq!(target.timeout, Duration::from_secs(5));
    assert_eq!(target.api_url("/offers"), "http://localhost:9999/acme/target/offers");
    assert_eq!(target.token_url, vitrine_client::config::DEFAULT_TOKEN_URL);
  }
}
