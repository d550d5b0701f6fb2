//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use circular_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The gateway did not supply a usable actor.
  #[error("missing or malformed actor: {0}")]
  MissingActor(String),

  /// `If-Match` does not name the current version.
  #[error("precondition failed: response is at version {current}")]
  PreconditionFailed { current: u32 },

  #[error(transparent)]
  Workflow(#[from] Error),
}

impl ApiError {
  fn status_and_code(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::MissingActor(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
      ApiError::PreconditionFailed { .. } => {
        (StatusCode::PRECONDITION_FAILED, "precondition_failed")
      }
      ApiError::Workflow(e) => match e {
        Error::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized"),
        Error::NotConfigured(_) => (StatusCode::NOT_FOUND, "not_configured"),
        Error::ActivityNotFound(_)
        | Error::ParticipantNotFound(_)
        | Error::ResponseNotFound(_)
        | Error::AttendanceNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        Error::IncompleteForm { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "incomplete_form"),
        Error::InvalidAnswer { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_answer"),
        Error::InvalidSignature(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_signature"),
        Error::InvalidHealthProfile(_) => {
          (StatusCode::UNPROCESSABLE_ENTITY, "invalid_health_profile")
        }
        Error::InvalidRejection => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_rejection"),
        Error::DeadlinePassed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "deadline_passed"),
        Error::NotReady(_) => (StatusCode::CONFLICT, "not_ready"),
        Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        Error::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        Error::DefinitionFrozen(_) => (StatusCode::CONFLICT, "definition_frozen"),
        Error::ActivityFrozen(_) => (StatusCode::CONFLICT, "activity_frozen"),
        Error::ConsentNotVerified(_) => (StatusCode::CONFLICT, "consent_not_verified"),
        Error::UpstreamUnavailable(_) => {
          (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable")
        }
        Error::Store(_) | Error::Directory(_) | Error::Serialization(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut body = json!({ "error": code, "message": self.to_string() });
    if let ApiError::Workflow(Error::IncompleteForm { missing }) = &self {
      body["missing"] = json!(missing);
    }
    (status, Json(body)).into_response()
  }
}
