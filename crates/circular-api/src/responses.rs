//! Handlers for `/responses/{id}` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/responses/{id}` | Returns the response with its `ETag` |
//! | `GET`  | `/responses/{id}/history` | Event log, oldest first |
//! | `POST` | `/responses/{id}/document` | Retry document generation |
//! | `PUT`  | `/responses/{id}/payment` | Body: `{"status":"PAID"}`; optional `If-Match` |

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, header},
  response::IntoResponse,
};
use circular_core::{
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  response::{CircularResult, PaymentStatus, ResponseEvent},
  store::CircularStore,
};
use circular_workflow::Portal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError, etag::etag, review::expected_version};

/// `GET /responses/{id}`
pub async fn get_one<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(response_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  let response = portal.response(&actor, response_id).await?;
  Ok(([(header::ETAG, etag(response.version))], Json(response)))
}

/// `GET /responses/{id}/history`
pub async fn history<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(response_id): Path<Uuid>,
) -> Result<Json<Vec<ResponseEvent>>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.history(&actor, response_id).await?))
}

/// `POST /responses/{id}/document`: 503 if the generator is still down.
pub async fn retry_document<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(response_id): Path<Uuid>,
) -> Result<Json<CircularResult>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.retry_document(&actor, response_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
  pub status: PaymentStatus,
}

/// `PUT /responses/{id}/payment`
pub async fn set_payment<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(response_id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<PaymentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  actor.staff()?;
  let expected = expected_version(&portal, &actor, response_id, &headers).await?;
  let response = portal
    .set_payment_status(&actor, response_id, body.status, expected)
    .await?;
  Ok(([(header::ETAG, etag(response.version))], Json(response)))
}
