//! Signing, and completing document generation for signed responses.

use chrono::Utc;
use circular_core::{
  Error, Result,
  answer::{self, Answers},
  auth::Actor,
  directory::ParticipantDirectory,
  document::{DocumentGenerator, RenderRequest},
  health::HealthProfileUpdate,
  response::{
    CircularResponse, CircularResult, CircularState, ResponseEvent, ResponseEventKind,
  },
  signature::SignatureBlob,
  store::CircularStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Portal, store_err};

/// A guardian's submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
  pub activity_id:    Uuid,
  pub participant_id: Uuid,
  #[serde(default)]
  pub answers:        Answers,
  /// Ids of the acknowledgements the guardian accepted.
  #[serde(default)]
  pub acknowledged:   Vec<String>,
  /// Base64 image or `data:image/...;base64,` URL.
  pub signature:      String,
  pub health_update:  Option<HealthProfileUpdate>,
}

/// Outcome of one pass over the responses still waiting for a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub attempted: usize,
  pub attached:  usize,
  pub failed:    usize,
}

/// Result of one document generation attempt.
enum Generation {
  Attached(CircularResponse),
  Failed {
    response: CircularResponse,
    reason:   String,
  },
  /// Someone else changed the response while the generator was running.
  Superseded(CircularResponse),
}

impl Generation {
  fn response(&self) -> &CircularResponse {
    match self {
      Self::Attached(r) | Self::Superseded(r) => r,
      Self::Failed { response, .. } => response,
    }
  }
}

impl<S, D, G> Portal<S, D, G>
where
  S: CircularStore,
  D: ParticipantDirectory,
  G: DocumentGenerator,
{
  /// Validate and commit a signature, then try to produce the signed
  /// document.
  ///
  /// Document generation failures never fail the call: the response is
  /// left in `SIGNED_DOCUMENT_PENDING` for a later retry.
  pub async fn sign(&self, actor: &Actor, request: SignRequest) -> Result<CircularResult> {
    let SignRequest {
      activity_id,
      participant_id,
      answers,
      acknowledged,
      signature,
      health_update,
    } = request;

    let guardian_id = actor.guardian()?;
    self.authorize_guardian(guardian_id, participant_id).await?;
    self.activity(activity_id).await?;
    let definition = self.definition(activity_id).await?;

    let now = Utc::now();
    if definition.deadline_passed(now) {
      return Err(Error::DeadlinePassed(activity_id));
    }

    let acknowledged = answer::normalize_acknowledged(acknowledged);
    answer::validate(&definition, &answers, &acknowledged)?;
    let signature = SignatureBlob::decode(&signature)?;
    if let Some(update) = &health_update {
      update.validate()?;
    }
    let signature_ref = signature.reference();

    let _guard = self.locks.acquire(activity_id, participant_id).await;

    let existing = self
      .store
      .find_response(activity_id, participant_id)
      .await
      .map_err(store_err)?;

    if let Some(prev) = &existing {
      let unchanged = health_update.is_none()
        && prev.same_submission(guardian_id, &answers, &acknowledged, &signature_ref);
      if unchanged {
        match prev.state {
          CircularState::Signed | CircularState::Verified if prev.document.is_some() => {
            tracing::debug!(response_id = %prev.response_id, "identical signature, nothing to do");
            return Ok(CircularResult::from(prev));
          }
          CircularState::SignedDocumentPending => {
            tracing::debug!(response_id = %prev.response_id, "identical signature, retrying document");
            let generation = self
              .generate_document(prev.clone(), definition.template_ref, signature.into_bytes())
              .await?;
            return Ok(CircularResult::from(generation.response()));
          }
          _ => {}
        }
      }
    }

    let health_profile_at = match health_update {
      Some(update) => {
        let record = update.into_record(participant_id, now);
        let at = record.profile.last_updated_at;
        self.store.put_health(record).await.map_err(store_err)?;
        tracing::info!(%participant_id, %guardian_id, "health profile replaced while signing");
        Some(at)
      }
      None => self
        .store
        .get_health(participant_id)
        .await
        .map_err(store_err)?
        .map(|r| r.profile.last_updated_at),
    };

    self
      .store
      .put_signature(signature_ref.clone(), signature.as_bytes().to_vec())
      .await
      .map_err(store_err)?;

    let (response_id, payment_status, expected_version, version) = match &existing {
      Some(prev) => (prev.response_id, prev.payment_status, Some(prev.version), prev.version + 1),
      None => (Uuid::new_v4(), Default::default(), None, 1),
    };

    let response = CircularResponse {
      response_id,
      activity_id,
      participant_id,
      guardian_id,
      answers,
      acknowledged,
      signature_ref,
      signed_at: now,
      state: CircularState::SignedDocumentPending,
      verification: None,
      rejection: None,
      document: None,
      payment_status,
      health_profile_at,
      version,
    };

    let event = ResponseEvent::new(response_id, ResponseEventKind::Signed {
      guardian_id,
      signature_ref: response.signature_ref.clone(),
      answers:       response.answers.clone(),
    });
    let committed = self
      .store
      .commit_response(response.clone(), expected_version, event)
      .await
      .map_err(store_err)?;
    if !committed {
      return Err(Error::Conflict(format!(
        "circular for participant {participant_id} changed while signing"
      )));
    }

    tracing::info!(
      %response_id,
      %activity_id,
      %participant_id,
      %guardian_id,
      resigned = existing.is_some(),
      "circular signed"
    );

    let generation = self
      .generate_document(response, definition.template_ref, signature.into_bytes())
      .await?;
    Ok(CircularResult::from(generation.response()))
  }

  /// Retry document generation for one pending response.
  ///
  /// Responses that already have a document, or were rejected meanwhile, are
  /// returned unchanged.
  pub async fn retry_document(&self, actor: &Actor, response_id: Uuid) -> Result<CircularResult> {
    let staff_id = actor.staff()?;
    let response = self.stored_response(response_id).await?;

    let _guard = self
      .locks
      .acquire(response.activity_id, response.participant_id)
      .await;
    let response = self.stored_response(response_id).await?;
    if response.state != CircularState::SignedDocumentPending {
      return Ok(CircularResult::from(&response));
    }

    tracing::info!(%response_id, %staff_id, "document retry requested");
    match self.regenerate(response).await? {
      Generation::Failed { reason, .. } => Err(Error::UpstreamUnavailable(reason)),
      done => Ok(CircularResult::from(done.response())),
    }
  }

  /// One pass over every response waiting for its document.
  pub async fn sweep_pending_documents(&self) -> Result<SweepReport> {
    let pending = self
      .store
      .list_responses_in_state(vec![CircularState::SignedDocumentPending])
      .await
      .map_err(store_err)?;

    let mut report = SweepReport::default();
    for candidate in pending {
      let _guard = self
        .locks
        .acquire(candidate.activity_id, candidate.participant_id)
        .await;
      let Some(response) = self
        .store
        .get_response(candidate.response_id)
        .await
        .map_err(store_err)?
      else {
        continue;
      };
      if response.state != CircularState::SignedDocumentPending {
        continue;
      }

      report.attempted += 1;
      match self.regenerate(response).await? {
        Generation::Attached(_) => report.attached += 1,
        Generation::Failed { .. } => report.failed += 1,
        Generation::Superseded(_) => {}
      }
    }

    if report.attempted > 0 {
      tracing::info!(
        attempted = report.attempted,
        attached = report.attached,
        failed = report.failed,
        "pending document sweep finished"
      );
    }
    Ok(report)
  }

  /// Reload the template and stored signature for `response`, then generate.
  async fn regenerate(&self, response: CircularResponse) -> Result<Generation> {
    let definition = self.definition(response.activity_id).await?;
    let signature = self
      .store
      .get_signature(response.signature_ref.clone())
      .await
      .map_err(store_err)?
      .ok_or_else(|| {
        Error::Store(format!("signature image {} is missing", response.signature_ref).into())
      })?;
    self
      .generate_document(response, definition.template_ref, signature)
      .await
  }

  /// Render the signed document under the configured timeout and record the
  /// outcome. Must be called with the pair lock held.
  async fn generate_document(
    &self,
    response: CircularResponse,
    template_ref: String,
    signature: Vec<u8>,
  ) -> Result<Generation> {
    let request = RenderRequest {
      template_ref,
      response_id: response.response_id,
      activity_id: response.activity_id,
      participant_id: response.participant_id,
      guardian_id: response.guardian_id,
      signed_at: response.signed_at,
      answers: response.answers.clone(),
      signature,
    };

    let rendered =
      tokio::time::timeout(self.config.document_timeout, self.generator.render(request)).await;

    let reason = match rendered {
      Ok(Ok(document)) => {
        let expected = response.version;
        let mut updated = response.clone();
        updated.attach_document(document.clone())?;
        let event = ResponseEvent::new(
          updated.response_id,
          ResponseEventKind::DocumentAttached { document },
        );
        match self
          .store
          .commit_response(updated.clone(), Some(expected), event)
          .await
        {
          Ok(true) => {
            tracing::info!(response_id = %updated.response_id, "signed document attached");
            return Ok(Generation::Attached(updated));
          }
          Ok(false) => {
            tracing::warn!(
              response_id = %updated.response_id,
              "response changed during document generation, discarding document"
            );
            let current = self.stored_response(updated.response_id).await?;
            return Ok(Generation::Superseded(current));
          }
          Err(e) => format!("could not store the signed document: {e}"),
        }
      }
      Ok(Err(e)) => e.to_string(),
      Err(_) => format!(
        "document generation timed out after {:?}",
        self.config.document_timeout
      ),
    };

    tracing::warn!(
      response_id = %response.response_id,
      %reason,
      "document generation failed, response left pending"
    );
    // The pending response is already stored; a lost audit entry is only logged.
    if let Err(e) = self
      .store
      .append_event(ResponseEvent::new(
        response.response_id,
        ResponseEventKind::DocumentFailed { reason: reason.clone() },
      ))
      .await
    {
      tracing::warn!(
        response_id = %response.response_id,
        error = %e,
        "could not record document failure"
      );
    }
    Ok(Generation::Failed { response, reason })
  }
}
