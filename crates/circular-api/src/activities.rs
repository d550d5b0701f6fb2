//! Staff authoring of activities and their circulars.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/activities/{id}` | Body: activity without its id |
//! | `GET`  | `/activities/{id}/circular` | Any actor |
//! | `PUT`  | `/activities/{id}/circular` | Body: [`DefinitionDraft`]; 409 once signed |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use circular_core::{
  activity::Activity, definition::CircularDefinition, directory::ParticipantDirectory,
  document::DocumentGenerator, store::CircularStore,
};
use circular_workflow::{DefinitionDraft, Portal};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
  pub title:             String,
  pub starts_at:         DateTime<Utc>,
  pub ends_at:           DateTime<Utc>,
  pub location:          Option<String>,
  #[serde(default)]
  pub sections:          Vec<String>,
  #[serde(default = "default_requires_circular")]
  pub requires_circular: bool,
}

fn default_requires_circular() -> bool { true }

/// `PUT /activities/{id}`
pub async fn put_activity<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(activity_id): Path<Uuid>,
  Json(body): Json<ActivityBody>,
) -> Result<Json<Activity>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  let activity = Activity {
    activity_id,
    title: body.title,
    starts_at: body.starts_at,
    ends_at: body.ends_at,
    location: body.location,
    sections: body.sections,
    requires_circular: body.requires_circular,
  };
  Ok(Json(portal.put_activity(&actor, activity).await?))
}

/// `GET /activities/{id}/circular`
pub async fn get_circular<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(_actor): CurrentActor,
  Path(activity_id): Path<Uuid>,
) -> Result<Json<CircularDefinition>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.get_definition(activity_id).await?))
}

/// `PUT /activities/{id}/circular`
pub async fn put_circular<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(activity_id): Path<Uuid>,
  Json(body): Json<DefinitionDraft>,
) -> Result<Json<CircularDefinition>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.put_definition(&actor, activity_id, body).await?))
}
