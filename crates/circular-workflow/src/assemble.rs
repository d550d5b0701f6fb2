//! Consent form assembly.

use chrono::Utc;
use circular_core::{
  Result,
  activity::Activity,
  auth::Actor,
  definition::CircularDefinition,
  directory::{Participant, ParticipantDirectory},
  document::DocumentGenerator,
  response::CircularResponse,
  store::CircularStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{HealthSnapshot, Portal, store_err};

/// Everything a guardian needs to fill in (or review) a circular.
#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
  pub activity:        Activity,
  pub participant:     Participant,
  pub definition:      CircularDefinition,
  pub health:          HealthSnapshot,
  /// The response on file, for pre-population or a read-only view.
  pub response:        Option<CircularResponse>,
  pub deadline_passed: bool,
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  /// Build the form for one participant and activity. Reads only.
  pub async fn assemble(
    &self,
    actor: &Actor,
    activity_id: Uuid,
    participant_id: Uuid,
  ) -> Result<FormSnapshot> {
    let guardian_id = actor.guardian()?;
    let participant = self.authorize_guardian(guardian_id, participant_id).await?;
    let activity = self.activity(activity_id).await?;
    let definition = self.definition(activity_id).await?;

    let health = self.store.get_health(participant_id).await.map_err(store_err)?;
    let response = self
      .store
      .find_response(activity_id, participant_id)
      .await
      .map_err(store_err)?;

    let now = Utc::now();
    Ok(FormSnapshot {
      deadline_passed: definition.deadline_passed(now),
      health: HealthSnapshot::new(health, now),
      activity,
      participant,
      definition,
      response,
    })
  }
}
