//! The participant directory: who the participants are and which guardians
//! may act for them.
//!
//! The directory is owned by the host system; this subsystem only reads it.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A minor enrolled in a scout section (Educando).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
  pub participant_id: Uuid,
  pub name:           String,
  pub surname:        String,
  pub birth_date:     NaiveDate,
  pub section:        String,
}

/// Read access to the host system's participants and guardian links.
pub trait ParticipantDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up a participant. Returns `None` if unknown.
  fn resolve_participant(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<Participant>, Self::Error>> + Send + '_;

  /// Whether `guardian_id` may act on behalf of `participant_id`.
  fn guardian_linked_to(
    &self,
    guardian_id: Uuid,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All participants enrolled in any of `sections`, optionally narrowed to a
  /// single section.
  fn list_participants(
    &self,
    sections: Vec<String>,
    section: Option<String>,
  ) -> impl Future<Output = Result<Vec<Participant>, Self::Error>> + Send + '_;
}
