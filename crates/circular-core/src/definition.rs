//! Circular definitions: the per-activity consent-form configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The value type a custom field accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
  Text,
  Boolean,
  /// One of a fixed list of options.
  Choice { options: Vec<String> },
}

impl FieldKind {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Boolean => "boolean",
      Self::Choice { .. } => "choice",
    }
  }
}

/// An activity-specific question on the circular.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
  /// Author-chosen stable key, e.g. `"allergy_ack"`.
  pub id:       String,
  pub label:    String,
  pub kind:     FieldKind,
  pub required: bool,
}

/// A statement the guardian must explicitly accept before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
  pub id:   String,
  pub text: String,
}

// ─── Definition ──────────────────────────────────────────────────────────────

/// Consent-form configuration for one activity.
///
/// Authored by staff before the first response arrives; frozen afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularDefinition {
  pub activity_id:        Uuid,
  /// Opaque template identifier handed to the document generator.
  pub template_ref:       String,
  #[serde(default)]
  pub fields:             Vec<CustomField>,
  #[serde(default)]
  pub acknowledgements:   Vec<Acknowledgement>,
  pub signature_deadline: Option<DateTime<Utc>>,
  pub updated_at:         DateTime<Utc>,
}

impl CircularDefinition {
  pub fn field(&self, id: &str) -> Option<&CustomField> {
    self.fields.iter().find(|f| f.id == id)
  }

  pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
    self.signature_deadline.is_some_and(|deadline| now > deadline)
  }
}
