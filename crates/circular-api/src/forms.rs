//! Guardian-facing form endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/form` | `?activity&participant`; returns a [`FormSnapshot`] |
//! | `POST` | `/sign` | Body: [`SignRequest`]; returns the [`CircularResult`] |

use axum::{
  Json,
  extract::{Query, State},
};
use circular_core::{
  directory::ParticipantDirectory, document::DocumentGenerator, response::CircularResult,
  store::CircularStore,
};
use circular_workflow::{FormSnapshot, Portal, SignRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FormParams {
  pub activity:    Uuid,
  pub participant: Uuid,
}

/// `GET /form?activity=<id>&participant=<id>`
pub async fn form<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<FormParams>,
) -> Result<Json<FormSnapshot>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  let snapshot = portal
    .assemble(&actor, params.activity, params.participant)
    .await?;
  Ok(Json(snapshot))
}

/// `POST /sign`
///
/// A document generator outage still answers 200, with state
/// `SIGNED_DOCUMENT_PENDING`.
pub async fn sign<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<SignRequest>,
) -> Result<Json<CircularResult>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.sign(&actor, body).await?))
}
