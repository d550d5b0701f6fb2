//! Error types for `circular-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::response::CircularState;

#[derive(Debug, Error)]
pub enum Error {
  /// The acting guardian is not linked to the participant, or the actor
  /// lacks the staff role.
  #[error("unauthorized")]
  Unauthorized,

  #[error("activity {0} has no circular configured")]
  NotConfigured(Uuid),

  #[error("form is incomplete; missing: {}", missing.join(", "))]
  IncompleteForm { missing: Vec<String> },

  #[error("invalid answer for field {field:?}: {reason}")]
  InvalidAnswer { field: String, reason: String },

  #[error("invalid signature: {0}")]
  InvalidSignature(String),

  /// Verification was attempted before the signed document exists.
  #[error("response {0} is waiting for document generation")]
  NotReady(Uuid),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("activity not found: {0}")]
  ActivityNotFound(Uuid),

  #[error("participant not found: {0}")]
  ParticipantNotFound(Uuid),

  #[error("circular response not found: {0}")]
  ResponseNotFound(Uuid),

  #[error("attendance confirmation not found: {0}")]
  AttendanceNotFound(Uuid),

  #[error("document generator unavailable: {0}")]
  UpstreamUnavailable(String),

  #[error("the signature deadline for activity {0} has passed")]
  DeadlinePassed(Uuid),

  #[error("circular for activity {0} already has responses and is frozen")]
  DefinitionFrozen(Uuid),

  /// Roster, dates and `requires_circular` are fixed once anyone has signed.
  #[error("activity {0} already has responses; only title and location may change")]
  ActivityFrozen(Uuid),

  #[error("cannot {action} a response in state {from}")]
  InvalidTransition {
    from:   CircularState,
    action: &'static str,
  },

  #[error("invalid health profile: {0}")]
  InvalidHealthProfile(String),

  #[error("a rejection needs a reason")]
  InvalidRejection,

  /// Attendance cannot be confirmed until the participant's circular has
  /// been verified.
  #[error("participant {0} has no verified circular for this activity")]
  ConsentNotVerified(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("participant directory error: {0}")]
  Directory(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
