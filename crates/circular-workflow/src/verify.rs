//! Staff review: the pending queue, verify/reject, statistics and the
//! per-response views.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use circular_core::{
  Error, Result,
  auth::Actor,
  directory::ParticipantDirectory,
  document::DocumentGenerator,
  response::{
    CircularResponse, CircularState, PaymentStatus, ResponseEvent, ResponseEventKind,
  },
  store::CircularStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Portal, store_err};

/// Signing progress over an activity roster.
///
/// `total == verified + pending_verification + not_yet_signed`. Rejected
/// responses count as not yet signed and are also reported in `rejected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CircularStats {
  pub total:                usize,
  pub total_signed:         usize,
  pub verified:             usize,
  pub pending_verification: usize,
  pub not_yet_signed:       usize,
  pub rejected:             usize,
}

impl CircularStats {
  fn count(&mut self, state: Option<CircularState>) {
    self.total += 1;
    match state {
      Some(CircularState::Verified) => {
        self.verified += 1;
        self.total_signed += 1;
      }
      Some(CircularState::Signed | CircularState::SignedDocumentPending) => {
        self.pending_verification += 1;
        self.total_signed += 1;
      }
      Some(CircularState::Rejected) => {
        self.rejected += 1;
        self.not_yet_signed += 1;
      }
      None => self.not_yet_signed += 1,
    }
  }
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  /// Responses awaiting review whose participant is on the roster.
  pub async fn list_pending(
    &self,
    actor: &Actor,
    activity_id: Uuid,
    section: Option<String>,
  ) -> Result<Vec<CircularResponse>> {
    actor.staff()?;
    let activity = self.activity(activity_id).await?;
    let roster: HashSet<Uuid> = self
      .roster(&activity, section)
      .await?
      .into_iter()
      .map(|p| p.participant_id)
      .collect();

    let mut pending = self
      .store
      .list_responses(activity_id)
      .await
      .map_err(store_err)?;
    pending.retain(|r| r.state.awaits_review() && roster.contains(&r.participant_id));
    Ok(pending)
  }

  /// Mark a signed response as verified.
  ///
  /// `expected_version` guards against acting on a stale read; a mismatch,
  /// or a concurrent change landing first, is a [`Error::Conflict`].
  pub async fn verify(
    &self,
    actor: &Actor,
    response_id: Uuid,
    expected_version: Option<u32>,
  ) -> Result<CircularResponse> {
    let staff_id = actor.staff()?;
    let mut response = self.stored_response(response_id).await?;
    check_version(&response, expected_version)?;

    let read_version = response.version;
    if !response.verify(staff_id, Utc::now())? {
      tracing::debug!(%response_id, "already verified");
      return Ok(response);
    }

    let event = ResponseEvent::new(response_id, ResponseEventKind::Verified { staff_id });
    self.commit_review(response.clone(), read_version, event).await?;
    tracing::info!(%response_id, %staff_id, "circular verified");
    Ok(response)
  }

  /// Reject a signed response; the guardian has to sign again.
  pub async fn reject(
    &self,
    actor: &Actor,
    response_id: Uuid,
    reason: &str,
    expected_version: Option<u32>,
  ) -> Result<CircularResponse> {
    let staff_id = actor.staff()?;
    let mut response = self.stored_response(response_id).await?;
    check_version(&response, expected_version)?;

    let read_version = response.version;
    if !response.reject(staff_id, reason, Utc::now())? {
      tracing::debug!(%response_id, "already rejected");
      return Ok(response);
    }

    let event = ResponseEvent::new(response_id, ResponseEventKind::Rejected {
      staff_id,
      reason: reason.trim().to_owned(),
    });
    self.commit_review(response.clone(), read_version, event).await?;
    tracing::info!(%response_id, %staff_id, "circular rejected");
    Ok(response)
  }

  pub async fn set_payment_status(
    &self,
    actor: &Actor,
    response_id: Uuid,
    status: PaymentStatus,
    expected_version: Option<u32>,
  ) -> Result<CircularResponse> {
    let staff_id = actor.staff()?;
    let mut response = self.stored_response(response_id).await?;
    check_version(&response, expected_version)?;
    if response.payment_status == status {
      return Ok(response);
    }

    let read_version = response.version;
    response.payment_status = status;
    response.version += 1;

    let event = ResponseEvent::new(response_id, ResponseEventKind::PaymentUpdated {
      staff_id,
      status,
    });
    self.commit_review(response.clone(), read_version, event).await?;
    tracing::info!(%response_id, %staff_id, %status, "payment status updated");
    Ok(response)
  }

  /// Signing progress over the (optionally section-filtered) roster.
  pub async fn stats(
    &self,
    actor: &Actor,
    activity_id: Uuid,
    section: Option<String>,
  ) -> Result<CircularStats> {
    actor.staff()?;
    let activity = self.activity(activity_id).await?;
    let roster = self.roster(&activity, section).await?;
    let states: HashMap<Uuid, CircularState> = self
      .store
      .list_responses(activity_id)
      .await
      .map_err(store_err)?
      .into_iter()
      .map(|r| (r.participant_id, r.state))
      .collect();

    let mut stats = CircularStats::default();
    for participant in &roster {
      stats.count(states.get(&participant.participant_id).copied());
    }
    Ok(stats)
  }

  /// A single response. Guardians see only responses for participants
  /// linked to them.
  pub async fn response(&self, actor: &Actor, response_id: Uuid) -> Result<CircularResponse> {
    let response = self.stored_response(response_id).await?;
    if let Actor::Guardian(guardian_id) = actor {
      self
        .authorize_guardian(*guardian_id, response.participant_id)
        .await?;
    }
    Ok(response)
  }

  /// The response's audit trail, oldest first.
  pub async fn history(&self, actor: &Actor, response_id: Uuid) -> Result<Vec<ResponseEvent>> {
    actor.staff()?;
    self.stored_response(response_id).await?;
    self.store.list_events(response_id).await.map_err(store_err)
  }

  async fn commit_review(
    &self,
    response: CircularResponse,
    read_version: u32,
    event: ResponseEvent,
  ) -> Result<()> {
    let response_id = response.response_id;
    let committed = self
      .store
      .commit_response(response, Some(read_version), event)
      .await
      .map_err(store_err)?;
    if committed {
      Ok(())
    } else {
      Err(Error::Conflict(format!(
        "response {response_id} changed since version {read_version}"
      )))
    }
  }
}

fn check_version(response: &CircularResponse, expected: Option<u32>) -> Result<()> {
  match expected {
    Some(v) if v != response.version => Err(Error::Conflict(format!(
      "response {} is at version {}, not {v}",
      response.response_id, response.version
    ))),
    _ => Ok(()),
  }
}
