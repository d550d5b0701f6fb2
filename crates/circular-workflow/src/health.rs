//! Health profile reads and writes.

use chrono::{DateTime, Utc};
use circular_core::{
  Result,
  auth::Actor,
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  health::{EmergencyContact, HealthProfile, HealthProfileUpdate, HealthRecord},
  store::CircularStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Portal, store_err};

/// A participant's health data as shown to guardians and staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
  pub profile:  Option<HealthProfile>,
  pub contacts: Vec<EmergencyContact>,
  /// Needs review. Always true when no profile exists yet.
  pub stale:    bool,
}

impl HealthSnapshot {
  pub fn new(record: Option<HealthRecord>, now: DateTime<Utc>) -> Self {
    match record {
      Some(HealthRecord { profile, contacts }) => Self {
        stale: profile.is_stale_at(now),
        profile: Some(profile),
        contacts,
      },
      None => Self {
        profile:  None,
        contacts: Vec::new(),
        stale:    true,
      },
    }
  }
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  /// Staff may read any participant; guardians only those linked to them.
  pub async fn get_health(&self, actor: &Actor, participant_id: Uuid) -> Result<HealthSnapshot> {
    match actor {
      Actor::Staff(_) => self.participant(participant_id).await?,
      Actor::Guardian(guardian_id) => {
        self.authorize_guardian(*guardian_id, participant_id).await?
      }
    };
    let record = self.store.get_health(participant_id).await.map_err(store_err)?;
    Ok(HealthSnapshot::new(record, Utc::now()))
  }

  /// Replace the profile and its contact list in one write.
  pub async fn put_health(
    &self,
    actor: &Actor,
    participant_id: Uuid,
    update: HealthProfileUpdate,
  ) -> Result<HealthRecord> {
    let guardian_id = actor.guardian()?;
    self.authorize_guardian(guardian_id, participant_id).await?;
    update.validate()?;

    let record = update.into_record(participant_id, Utc::now());
    self.store.put_health(record.clone()).await.map_err(store_err)?;

    tracing::info!(%participant_id, %guardian_id, "health profile replaced");
    Ok(record)
  }
}
