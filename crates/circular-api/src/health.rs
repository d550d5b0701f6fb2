//! `GET`/`PUT /health/{participant_id}`.

use axum::{
  Json,
  extract::{Path, State},
};
use circular_core::{
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  health::{HealthProfileUpdate, HealthRecord},
  store::CircularStore,
};
use circular_workflow::{HealthSnapshot, Portal};
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

pub async fn get_one<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(participant_id): Path<Uuid>,
) -> Result<Json<HealthSnapshot>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.get_health(&actor, participant_id).await?))
}

/// Replaces the profile and every emergency contact.
pub async fn replace<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(participant_id): Path<Uuid>,
  Json(body): Json<HealthProfileUpdate>,
) -> Result<Json<HealthRecord>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.put_health(&actor, participant_id, body).await?))
}
