//! Attendance confirmation, keyed by the same pair as the circular.

use std::collections::HashMap;

use chrono::Utc;
use circular_core::{
  Error, Result,
  activity::Activity,
  attendance::{AttendanceConfirmation, AttendanceEntry, AttendanceState, AttendanceView},
  auth::Actor,
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  response::CircularState,
  store::CircularStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Portal, store_err};

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmAttendance {
  pub activity_id:    Uuid,
  pub participant_id: Uuid,
  pub attending:      bool,
  pub comment:        Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifyAttendance {
  pub attending: bool,
  pub comment:   Option<String>,
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  /// Record a guardian's attendance decision, creating the confirmation on
  /// first use.
  pub async fn confirm_attendance(
    &self,
    actor: &Actor,
    input: ConfirmAttendance,
  ) -> Result<AttendanceView> {
    let guardian_id = actor.guardian()?;
    self.authorize_guardian(guardian_id, input.participant_id).await?;

    let confirmation = self
      .store
      .find_attendance(input.activity_id, input.participant_id)
      .await
      .map_err(store_err)?
      .unwrap_or_else(|| AttendanceConfirmation {
        confirmation_id: Uuid::new_v4(),
        activity_id:     input.activity_id,
        participant_id:  input.participant_id,
        state:           AttendanceState::Pending,
        comment:         None,
        decided_at:      None,
        decided_by:      None,
      });

    self
      .decide_attendance(confirmation, guardian_id, input.attending, input.comment)
      .await
  }

  /// Change an existing decision.
  pub async fn modify_attendance(
    &self,
    actor: &Actor,
    confirmation_id: Uuid,
    input: ModifyAttendance,
  ) -> Result<AttendanceView> {
    let guardian_id = actor.guardian()?;
    let confirmation = self
      .store
      .get_attendance(confirmation_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::AttendanceNotFound(confirmation_id))?;
    self
      .authorize_guardian(guardian_id, confirmation.participant_id)
      .await?;

    self
      .decide_attendance(confirmation, guardian_id, input.attending, input.comment)
      .await
  }

  /// The roster with each participant's attendance and circular state.
  /// Participants without a decision are listed as `PENDING`.
  pub async fn list_attendance(
    &self,
    actor: &Actor,
    activity_id: Uuid,
    section: Option<String>,
  ) -> Result<Vec<AttendanceEntry>> {
    actor.staff()?;
    let activity = self.activity(activity_id).await?;
    let roster = self.roster(&activity, section).await?;

    let mut decisions: HashMap<Uuid, AttendanceConfirmation> = self
      .store
      .list_attendance(activity_id)
      .await
      .map_err(store_err)?
      .into_iter()
      .map(|c| (c.participant_id, c))
      .collect();
    let states: HashMap<Uuid, CircularState> = self
      .store
      .list_responses(activity_id)
      .await
      .map_err(store_err)?
      .into_iter()
      .map(|r| (r.participant_id, r.state))
      .collect();

    Ok(
      roster
        .into_iter()
        .map(|p| {
          let decision = decisions.remove(&p.participant_id);
          AttendanceEntry {
            participant_id: p.participant_id,
            state:          decision.as_ref().map_or(AttendanceState::Pending, |c| c.state),
            comment:        decision.and_then(|c| c.comment),
            circular_state: states.get(&p.participant_id).copied(),
          }
        })
        .collect(),
    )
  }

  async fn decide_attendance(
    &self,
    mut confirmation: AttendanceConfirmation,
    guardian_id: Uuid,
    attending: bool,
    comment: Option<String>,
  ) -> Result<AttendanceView> {
    // Spans the policy check and the save.
    let _guard = self
      .locks
      .acquire(confirmation.activity_id, confirmation.participant_id)
      .await;
    let activity = self.activity(confirmation.activity_id).await?;
    let circular_state = self
      .store
      .find_response(confirmation.activity_id, confirmation.participant_id)
      .await
      .map_err(store_err)?
      .map(|r| r.state);

    self.check_attendance_policy(&activity, confirmation.participant_id, attending, circular_state)?;

    confirmation.decide(guardian_id, attending, comment, Utc::now());
    let confirmation = self
      .store
      .save_attendance(confirmation)
      .await
      .map_err(store_err)?;

    tracing::info!(
      confirmation_id = %confirmation.confirmation_id,
      activity_id = %confirmation.activity_id,
      participant_id = %confirmation.participant_id,
      state = %confirmation.state,
      "attendance decided"
    );
    Ok(AttendanceView { confirmation, circular_state })
  }

  fn check_attendance_policy(
    &self,
    activity: &Activity,
    participant_id: Uuid,
    attending: bool,
    circular_state: Option<CircularState>,
  ) -> Result<()> {
    let gated = attending
      && self.config.require_verified_for_attendance
      && activity.requires_circular;
    if gated && circular_state != Some(CircularState::Verified) {
      return Err(Error::ConsentNotVerified(participant_id));
    }
    Ok(())
  }
}
