//! API error type and [`axum::response::IntoResponse`] implementation.

use accord_core::{Fault, FaultKind};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The storage layer timed out; the caller may retry. Nothing is
  /// retried here.
  #[error("storage timeout: {0}")]
  Timeout(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error via its [`FaultKind`].
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Fault + Send + Sync + 'static,
  {
    match err.fault_kind() {
      FaultKind::NotFound => ApiError::NotFound(err.to_string()),
      FaultKind::InvalidParameter => ApiError::BadRequest(err.to_string()),
      FaultKind::Timeout => ApiError::Timeout(err.to_string()),
      FaultKind::InvariantViolation | FaultKind::Internal => {
        ApiError::Store(Box::new(err))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Timeout(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
