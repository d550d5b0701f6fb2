//! Attendance confirmations: whether a participant will attend an activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::response::CircularState;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceState {
  /// No decision yet; implicit for roster participants without a row.
  #[default]
  Pending,
  Confirmed,
  Declined,
}

impl AttendanceState {
  pub fn from_attending(attending: bool) -> Self {
    if attending { Self::Confirmed } else { Self::Declined }
  }
}

/// Unique per `(activity_id, participant_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceConfirmation {
  pub confirmation_id: Uuid,
  pub activity_id:     Uuid,
  pub participant_id:  Uuid,
  pub state:           AttendanceState,
  pub comment:         Option<String>,
  pub decided_at:      Option<DateTime<Utc>>,
  /// The guardian who made the latest decision.
  pub decided_by:      Option<Uuid>,
}

impl AttendanceConfirmation {
  /// Record a guardian's decision.
  pub fn decide(
    &mut self,
    guardian_id: Uuid,
    attending: bool,
    comment: Option<String>,
    now: DateTime<Utc>,
  ) {
    self.state = AttendanceState::from_attending(attending);
    self.comment = comment.filter(|c| !c.trim().is_empty());
    self.decided_at = Some(now);
    self.decided_by = Some(guardian_id);
  }
}

/// An attendance decision together with the participant's circular state,
/// so the guardian always sees where the consent stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceView {
  pub confirmation:   AttendanceConfirmation,
  /// `None` when no circular has been signed.
  pub circular_state: Option<CircularState>,
}

/// One roster line of the staff attendance overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
  pub participant_id:  Uuid,
  pub state:           AttendanceState,
  pub comment:         Option<String>,
  pub circular_state:  Option<CircularState>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decide_maps_attending_flag() {
    let mut c = AttendanceConfirmation {
      confirmation_id: Uuid::new_v4(),
      activity_id:     Uuid::new_v4(),
      participant_id:  Uuid::new_v4(),
      state:           AttendanceState::Pending,
      comment:         None,
      decided_at:      None,
      decided_by:      None,
    };
    let guardian = Uuid::new_v4();

    c.decide(guardian, true, Some("arrives late".into()), Utc::now());
    assert_eq!(c.state, AttendanceState::Confirmed);
    assert_eq!(c.comment.as_deref(), Some("arrives late"));
    assert_eq!(c.decided_by, Some(guardian));

    c.decide(guardian, false, Some("".into()), Utc::now());
    assert_eq!(c.state, AttendanceState::Declined);
    assert_eq!(c.comment, None);
  }
}
