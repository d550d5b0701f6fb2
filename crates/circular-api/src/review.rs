//! Staff review endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/pending` | `?activity[&section]` |
//! | `POST` | `/verify/{response_id}` | Optional `If-Match` |
//! | `POST` | `/reject/{response_id}` | Body: `{"reason":"..."}`; optional `If-Match` |
//! | `GET`  | `/stats` | `?activity[&section]` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, header},
  response::IntoResponse,
};
use circular_core::{
  directory::ParticipantDirectory, document::DocumentGenerator, response::CircularResponse,
  store::CircularStore,
};
use circular_workflow::{CircularStats, Portal};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  actor::CurrentActor,
  error::ApiError,
  etag::{etag, if_match},
};

/// Query for roster-scoped staff views.
#[derive(Debug, Deserialize)]
pub struct RosterParams {
  pub activity: Uuid,
  pub section:  Option<String>,
}

/// `GET /pending?activity=<id>[&section=<name>]`
pub async fn pending<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<RosterParams>,
) -> Result<Json<Vec<CircularResponse>>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  let pending = portal
    .list_pending(&actor, params.activity, params.section)
    .await?;
  Ok(Json(pending))
}

/// `GET /stats?activity=<id>[&section=<name>]`
pub async fn stats<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<RosterParams>,
) -> Result<Json<CircularStats>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Ok(Json(portal.stats(&actor, params.activity, params.section).await?))
}

/// Resolve `If-Match` against the stored version. The workflow re-checks
/// at commit, so a change landing after this point is still caught.
pub(crate) async fn expected_version<S, D, G>(
  portal: &Portal<S, D, G>,
  actor: &circular_core::auth::Actor,
  response_id: Uuid,
  headers: &HeaderMap,
) -> Result<Option<u32>, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  if !headers.contains_key(header::IF_MATCH) {
    return Ok(None);
  }
  let current = portal.response(actor, response_id).await?;
  if_match(headers, current.version)
}

/// `POST /verify/{response_id}`
pub async fn verify<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(response_id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  actor.staff()?;
  let expected = expected_version(&portal, &actor, response_id, &headers).await?;
  let response = portal.verify(&actor, response_id, expected).await?;
  Ok(([(header::ETAG, etag(response.version))], Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub reason: String,
}

/// `POST /reject/{response_id}` with body `{"reason":"..."}`.
pub async fn reject<S, D, G>(
  State(portal): State<Portal<S, D, G>>,
  CurrentActor(actor): CurrentActor,
  Path(response_id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<RejectBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  actor.staff()?;
  let expected = expected_version(&portal, &actor, response_id, &headers).await?;
  let response = portal
    .reject(&actor, response_id, &body.reason, expected)
    .await?;
  Ok(([(header::ETAG, etag(response.version))], Json(response)))
}
