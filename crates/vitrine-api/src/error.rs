//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Rendered as `{"message": ..., "details": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  /// A failed call into the platform, with a human-readable summary of what
  /// the handler was doing.
  #[error("{context}")]
  Upstream {
    context: String,
    #[source]
    source:  vitrine_core::Error,
  },
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Upstream { source, .. } => match source {
        vitrine_core::Error::Validation(_) => StatusCode::BAD_REQUEST,
        vitrine_core::Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      ApiError::NotFound(m) | ApiError::BadRequest(m) => json!({ "message": m }),
      ApiError::Upstream { context, source } => {
        if status.is_server_error() {
          tracing::error!(error = %source, "{context}");
        }
        json!({ "message": context, "details": source.details() })
      }
    };
    (status, Json(body)).into_response()
  }
}

/// Attach a handler-level message to a platform error.
pub trait Context<T> {
  fn context(self, message: impl Into<String>) -> Result<T, ApiError>;
}

impl<T> Context<T> for vitrine_core::Result<T> {
  fn context(self, message: impl Into<String>) -> Result<T, ApiError> {
    self.map_err(|source| ApiError::Upstream {
      context: message.into(),
      source,
    })
  }
}
