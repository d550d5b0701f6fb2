//! The circular consent workflow: form assembly, signing, staff review and
//! attendance confirmation.
//!
//! [`Portal`] ties a [`CircularStore`], a [`ParticipantDirectory`] and a
//! [`DocumentGenerator`] together. Every operation takes the calling
//! [`Actor`](circular_core::auth::Actor) explicitly; nothing is read from
//! ambient state.
//!
//! # Construction
//!
//! ```rust,ignore
//! let store = Arc::new(SqliteStore::open("circular.db").await?);
//! let portal = Portal::new(store.clone(), store, Arc::new(generator), PortalConfig::default());
//! ```

mod assemble;
mod attendance;
mod definition;
mod health;
mod locks;
mod sign;
mod verify;

use std::{sync::Arc, time::Duration};

use circular_core::{
  Error, Result,
  activity::Activity,
  definition::CircularDefinition,
  directory::{Participant, ParticipantDirectory},
  document::DocumentGenerator,
  response::CircularResponse,
  store::CircularStore,
};
use uuid::Uuid;

pub use assemble::FormSnapshot;
pub use attendance::{ConfirmAttendance, ModifyAttendance};
pub use definition::DefinitionDraft;
pub use health::HealthSnapshot;
pub use sign::{SignRequest, SweepReport};
pub use verify::CircularStats;

use locks::PairLocks;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Workflow policy knobs.
#[derive(Debug, Clone)]
pub struct PortalConfig {
  /// Upper bound on a single document generation attempt.
  pub document_timeout:                Duration,
  /// Refuse `CONFIRMED` attendance for activities requiring a circular
  /// unless the participant's response is `VERIFIED`.
  pub require_verified_for_attendance: bool,
}

impl Default for PortalConfig {
  fn default() -> Self {
    Self {
      document_timeout:                Duration::from_secs(10),
      require_verified_for_attendance: false,
    }
  }
}

// ─── Portal ──────────────────────────────────────────────────────────────────

/// Entry point for every workflow operation.
///
/// Cheap to clone; clones share the same store, directory, generator and
/// per-participant locks.
pub struct Portal<S, D, G> {
  store:     Arc<S>,
  directory: Arc<D>,
  generator: Arc<G>,
  config:    PortalConfig,
  locks:     PairLocks,
}

impl<S, D, G> Clone for Portal<S, D, G> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      directory: self.directory.clone(),
      generator: self.generator.clone(),
      config:    self.config.clone(),
      locks:     self.locks.clone(),
    }
  }
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  pub fn new(
    store: Arc<S>,
    directory: Arc<D>,
    generator: Arc<G>,
    config: PortalConfig,
  ) -> Self {
    Self {
      store,
      directory,
      generator,
      config,
      locks: PairLocks::default(),
    }
  }

  pub fn config(&self) -> &PortalConfig { &self.config }

  // ── Shared lookups ────────────────────────────────────────────────────────

  /// Check that `guardian_id` may act for `participant_id` and resolve the
  /// participant.
  async fn authorize_guardian(
    &self,
    guardian_id: Uuid,
    participant_id: Uuid,
  ) -> Result<Participant> {
    let linked = self
      .directory
      .guardian_linked_to(guardian_id, participant_id)
      .await
      .map_err(directory_err)?;
    if !linked {
      tracing::debug!(%guardian_id, %participant_id, "guardian not linked to participant");
      return Err(Error::Unauthorized);
    }
    self.participant(participant_id).await
  }

  async fn participant(&self, participant_id: Uuid) -> Result<Participant> {
    self
      .directory
      .resolve_participant(participant_id)
      .await
      .map_err(directory_err)?
      .ok_or(Error::ParticipantNotFound(participant_id))
  }

  async fn activity(&self, activity_id: Uuid) -> Result<Activity> {
    self
      .store
      .get_activity(activity_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::ActivityNotFound(activity_id))
  }

  async fn definition(&self, activity_id: Uuid) -> Result<CircularDefinition> {
    self
      .store
      .get_definition(activity_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotConfigured(activity_id))
  }

  async fn stored_response(&self, response_id: Uuid) -> Result<CircularResponse> {
    self
      .store
      .get_response(response_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::ResponseNotFound(response_id))
  }

  /// The activity roster, optionally narrowed to one section. A section the
  /// activity does not include yields an empty roster.
  async fn roster(
    &self,
    activity: &Activity,
    section: Option<String>,
  ) -> Result<Vec<Participant>> {
    if let Some(s) = &section {
      if !activity.includes_section(s) {
        return Ok(Vec::new());
      }
    }
    self
      .directory
      .list_participants(activity.sections.clone(), section)
      .await
      .map_err(directory_err)
  }
}

pub(crate) fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}

pub(crate) fn directory_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Directory(Box::new(e))
}
