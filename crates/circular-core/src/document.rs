//! The document generator: renders a signed circular into a PDF held by an
//! external service.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{answer::Answers, response::DocumentRef};

/// Everything the renderer needs to produce the signed document.
#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest {
  pub template_ref:   String,
  pub response_id:    Uuid,
  pub activity_id:    Uuid,
  pub participant_id: Uuid,
  pub guardian_id:    Uuid,
  pub signed_at:      DateTime<Utc>,
  pub answers:        Answers,
  /// Decoded signature image bytes.
  #[serde(skip)]
  pub signature:      Vec<u8>,
}

/// Fallible and possibly slow; callers bound it with a timeout.
pub trait DocumentGenerator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn render(
    &self,
    request: RenderRequest,
  ) -> impl Future<Output = Result<DocumentRef, Self::Error>> + Send + '_;
}
