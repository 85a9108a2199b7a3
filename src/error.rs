use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::llm::GatewayError;
use crate::protocol::ErrorOut;
use crate::store::StoreError;

/// Errors surfaced to HTTP clients as `{"detail": "..."}`.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
  #[error("{1}")]
  Client(StatusCode, String),
  #[error("Unauthorized")]
  Unauthorized,
  // Froms
  #[error(transparent)]
  Gateway(#[from] GatewayError),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn bad_request(detail: impl Into<String>) -> Self {
    ApiError::Client(StatusCode::BAD_REQUEST, detail.into())
  }

  pub fn not_found(detail: impl Into<String>) -> Self {
    ApiError::Client(StatusCode::NOT_FOUND, detail.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Client(c, _) => *c,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Gateway(GatewayError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
      ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let detail = match &self {
      ApiError::Store(e) => {
        error!(target: "dsa_mentor", error = %e, "Store operation failed");
        "Internal server error".to_string()
      }
      ApiError::Internal(msg) => {
        error!(target: "dsa_mentor", error = %msg, "Internal error");
        "Internal server error".to_string()
      }
      other => other.to_string(),
    };
    let mut res = (status, Json(ErrorOut { detail })).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(axum::http::header::WWW_AUTHENTICATE, axum::http::HeaderValue::from_static("Bearer"));
    }
    res
  }
}
