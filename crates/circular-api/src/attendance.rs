//! Attendance endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use circular_core::{
  attendance::{AttendanceEntry, AttendanceView},
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  store::CircularStore,
};
use circular_workflow::{ConfirmAttendance, ModifyAttendance, Portal};
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError, review::RosterParams};

/// `POST /confirm-attendance`
pub async fn confirm<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<ConfirmAttendance>,
) -> Result<Json<AttendanceView>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.confirm_attendance(&actor, body).await?))
}

/// `PUT /modify-attendance/{confirmation_id}`
pub async fn modify<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(confirmation_id): Path<Uuid>,
  Json(body): Json<ModifyAttendance>,
) -> Result<Json<AttendanceView>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(
    portal.modify_attendance(&actor, confirmation_id, body).await?,
  ))
}

/// `GET /attendance?activity=<id>[&section=<name>]`
pub async fn list<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<RosterParams>,
) -> Result<Json<Vec<AttendanceEntry>>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  let roster = portal
    .list_attendance(&actor, params.activity, params.section)
    .await?;
  Ok(Json(roster))
}
