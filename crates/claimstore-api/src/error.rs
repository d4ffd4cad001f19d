//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"status":"error","message":..,"details"?:..}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use claimstore_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{message}")]
  InvalidData {
    message: String,
    details: Option<String>,
  },

  #[error("{0}")]
  InvalidRequest(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Split a backend error into a client error (when it carries a domain
  /// error) or a storage failure.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(domain) => Self::from_domain(domain),
      None => ApiError::Store(Box::new(err)),
    }
  }

  fn from_domain(err: &claimstore_core::Error) -> Self {
    use claimstore_core::Error;
    match err {
      Error::InvalidData { message, details } => ApiError::InvalidData {
        message: message.clone(),
        details: details.clone(),
      },
      Error::InvalidRequest(rejection) => ApiError::InvalidRequest(rejection.to_string()),
      Error::Serialization(e) => ApiError::InvalidData {
        message: "JSON data is not valid".into(),
        details: Some(e.to_string()),
      },
    }
  }
}

impl From<claimstore_core::Error> for ApiError {
  fn from(err: claimstore_core::Error) -> Self { Self::from_domain(&err) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::InvalidData {
      message: "JSON data is not valid".into(),
      details: Some(rejection.body_text()),
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::InvalidData {
      message: "Query parameters are not valid".into(),
      details: Some(rejection.body_text()),
    }
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::InvalidData {
      message: "Path parameter is not valid".into(),
      details: Some(rejection.body_text()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message, details) = match self {
      ApiError::InvalidData { message, details } => (StatusCode::BAD_REQUEST, message, details),
      ApiError::InvalidRequest(m) => (StatusCode::BAD_REQUEST, m, None),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m, None),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m, None),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
      }
    };

    let mut body = json!({ "status": "error", "message": message });
    if let Some(details) = details {
      body["details"] = details.into();
    }
    (status, Json(body)).into_response()
  }
}
