//! Circular responses, their state machine and the append-only event log.
//!
//! A [`CircularResponse`] is the current-state view of one participant's
//! circular for one activity. Every change to it is also recorded as a
//! [`ResponseEvent`], so earlier signatures and decisions survive a re-sign.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, answer::Answers};

// ─── State ───────────────────────────────────────────────────────────────────

/// Lifecycle of a response. `UNSIGNED` is implicit: no row exists.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CircularState {
  /// Signature persisted; the signed document is outstanding or failed.
  SignedDocumentPending,
  /// Signature persisted and the signed document exists.
  Signed,
  Verified,
  /// Staff rejected the response; the guardian has to sign again.
  Rejected,
}

impl CircularState {
  /// Signed but not yet reviewed by staff.
  pub fn awaits_review(self) -> bool {
    matches!(self, Self::Signed | Self::SignedDocumentPending)
  }
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  #[default]
  Pending,
  Paid,
  Exempt,
}

// ─── Sub-records ─────────────────────────────────────────────────────────────

/// The rendered, signed document held by the external generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
  pub document_id: String,
  pub url:         String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
  pub verified_by: Uuid,
  pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
  pub rejected_by: Uuid,
  pub rejected_at: DateTime<Utc>,
  pub reason:      String,
}

// ─── Response ────────────────────────────────────────────────────────────────

/// One participant's circular for one activity. Unique per
/// `(activity_id, participant_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularResponse {
  pub response_id:       Uuid,
  pub activity_id:       Uuid,
  pub participant_id:    Uuid,
  /// The guardian who signed most recently.
  pub guardian_id:       Uuid,
  pub answers:           Answers,
  pub acknowledged:      Vec<String>,
  /// SHA-256 hex digest of the stored signature image.
  pub signature_ref:     String,
  pub signed_at:         DateTime<Utc>,
  pub state:             CircularState,
  pub verification:      Option<Verification>,
  pub rejection:         Option<Rejection>,
  pub document:          Option<DocumentRef>,
  pub payment_status:    PaymentStatus,
  /// `last_updated_at` of the health profile the guardian signed against.
  pub health_profile_at: Option<DateTime<Utc>>,
  /// Incremented on every committed change; used for optimistic concurrency.
  pub version:           u32,
}

impl CircularResponse {
  /// Whether a new signature carries exactly the content already on file.
  /// Acknowledgements compare as a set.
  pub fn same_submission(
    &self,
    guardian_id: Uuid,
    answers: &Answers,
    acknowledged: &[String],
    signature_ref: &str,
  ) -> bool {
    self.guardian_id == guardian_id
      && &self.answers == answers
      && self.acknowledged.iter().collect::<BTreeSet<_>>()
        == acknowledged.iter().collect::<BTreeSet<_>>()
      && self.signature_ref == signature_ref
  }

  /// Attach the generated document, completing the signature.
  pub fn attach_document(&mut self, document: DocumentRef) -> Result<()> {
    if self.state != CircularState::SignedDocumentPending {
      return Err(Error::InvalidTransition {
        from:   self.state,
        action: "attach a document to",
      });
    }
    self.document = Some(document);
    self.state = CircularState::Signed;
    self.version += 1;
    Ok(())
  }

  /// Apply a staff verification.
  ///
  /// Returns `Ok(false)` when the response is already verified, leaving it
  /// untouched.
  pub fn verify(&mut self, staff_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    match self.state {
      CircularState::Verified => Ok(false),
      CircularState::SignedDocumentPending => Err(Error::NotReady(self.response_id)),
      CircularState::Signed if self.document.is_none() => {
        Err(Error::NotReady(self.response_id))
      }
      CircularState::Signed => {
        self.state = CircularState::Verified;
        self.verification = Some(Verification {
          verified_by: staff_id,
          verified_at: now,
        });
        self.rejection = None;
        self.version += 1;
        Ok(true)
      }
      CircularState::Rejected => Err(Error::InvalidTransition {
        from:   self.state,
        action: "verify",
      }),
    }
  }

  /// Apply a staff rejection.
  ///
  /// Returns `Ok(false)` when the response is already rejected.
  pub fn reject(
    &mut self,
    staff_id: Uuid,
    reason: &str,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    if reason.trim().is_empty() {
      return Err(Error::InvalidRejection);
    }
    match self.state {
      CircularState::Rejected => Ok(false),
      CircularState::Verified => Err(Error::InvalidTransition {
        from:   self.state,
        action: "reject",
      }),
      CircularState::Signed | CircularState::SignedDocumentPending => {
        self.state = CircularState::Rejected;
        self.rejection = Some(Rejection {
          rejected_by: staff_id,
          rejected_at: now,
          reason:      reason.trim().to_owned(),
        });
        self.verification = None;
        self.version += 1;
        Ok(true)
      }
    }
  }
}

/// What `sign` hands back to the guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularResult {
  pub response_id: Uuid,
  pub document:    Option<DocumentRef>,
  pub state:       CircularState,
}

impl From<&CircularResponse> for CircularResult {
  fn from(r: &CircularResponse) -> Self {
    Self {
      response_id: r.response_id,
      document:    r.document.clone(),
      state:       r.state,
    }
  }
}

// ─── Event log ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseEventKind {
  Signed {
    guardian_id:   Uuid,
    signature_ref: String,
    answers:       Answers,
  },
  DocumentAttached {
    document: DocumentRef,
  },
  DocumentFailed {
    reason: String,
  },
  Verified {
    staff_id: Uuid,
  },
  Rejected {
    staff_id: Uuid,
    reason:   String,
  },
  PaymentUpdated {
    staff_id: Uuid,
    status:   PaymentStatus,
  },
}

impl ResponseEventKind {
  /// The discriminant string stored in the `kind` column.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Signed { .. } => "signed",
      Self::DocumentAttached { .. } => "document_attached",
      Self::DocumentFailed { .. } => "document_failed",
      Self::Verified { .. } => "verified",
      Self::Rejected { .. } => "rejected",
      Self::PaymentUpdated { .. } => "payment_updated",
    }
  }
}

/// An immutable entry in a response's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
  pub event_id:    Uuid,
  pub response_id: Uuid,
  pub recorded_at: DateTime<Utc>,
  #[serde(flatten)]
  pub kind:        ResponseEventKind,
}

impl ResponseEvent {
  pub fn new(response_id: Uuid, kind: ResponseEventKind) -> Self {
    Self {
      event_id: Uuid::new_v4(),
      response_id,
      recorded_at: Utc::now(),
      kind,
    }
  }
}
