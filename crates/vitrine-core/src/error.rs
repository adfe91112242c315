//! Error types for `vitrine-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The credential endpoint failed or returned a malformed payload.
  #[error("authentication failed: {0}")]
  Auth(String),

  /// A non-success response (or transport failure) from the remote API.
  #[error("remote API error: {message}")]
  RemoteApi {
    status:  Option<u16>,
    message: String,
    body:    Option<String>,
  },

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// A remote failure that never produced an HTTP status.
  pub fn transport(message: impl Into<String>) -> Self {
    Self::RemoteApi {
      status:  None,
      message: message.into(),
      body:    None,
    }
  }

  /// A remote failure with the upstream status and response body.
  pub fn status(status: u16, context: &str, body: impl Into<String>) -> Self {
    let body = body.into();
    Self::RemoteApi {
      status:  Some(status),
      message: format!("{context} (status {status}): {body}"),
      body:    (!body.is_empty()).then_some(body),
    }
  }

  /// Upstream HTTP status, when the error came from a remote response.
  pub fn upstream_status(&self) -> Option<u16> {
    match self {
      Self::RemoteApi { status, .. } => *status,
      _ => None,
    }
  }

  /// Human-readable detail for error responses: the upstream body when one
  /// was captured, the display message otherwise.
  pub fn details(&self) -> String {
    match self {
      Self::RemoteApi { body: Some(body), .. } => body.clone(),
      other => other.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
