//! Typed custom-field answers and their validation against a definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  definition::{CircularDefinition, FieldKind},
};

/// A guardian's answer to one custom field. The variant must match the
/// field's [`FieldKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
  Text(String),
  Boolean(bool),
  Choice(String),
}

impl AnswerValue {
  /// Blank text or choice values count as unanswered. A boolean is always
  /// an answer, `false` included.
  pub fn is_empty(&self) -> bool {
    match self {
      Self::Text(s) | Self::Choice(s) => s.trim().is_empty(),
      Self::Boolean(_) => false,
    }
  }

  fn kind_name(&self) -> &'static str {
    match self {
      Self::Text(_) => "text",
      Self::Boolean(_) => "boolean",
      Self::Choice(_) => "choice",
    }
  }
}

/// Answers keyed by [`CustomField::id`](crate::definition::CustomField).
pub type Answers = BTreeMap<String, AnswerValue>;

/// Check `answers` and `acknowledged` against `definition`.
///
/// Missing required fields and unaccepted acknowledgements are reported
/// together as [`Error::IncompleteForm`], field ids first. Once the form is
/// complete, every supplied answer must name a known field and match its
/// kind, and every accepted acknowledgement must exist on the definition.
pub fn validate(
  definition: &CircularDefinition,
  answers: &Answers,
  acknowledged: &[String],
) -> Result<()> {
  let mut missing: Vec<String> = definition
    .fields
    .iter()
    .filter(|f| f.required)
    .filter(|f| answers.get(&f.id).is_none_or(AnswerValue::is_empty))
    .map(|f| f.id.clone())
    .collect();

  missing.extend(
    definition
      .acknowledgements
      .iter()
      .filter(|a| !acknowledged.contains(&a.id))
      .map(|a| a.id.clone()),
  );

  if !missing.is_empty() {
    return Err(Error::IncompleteForm { missing });
  }

  if let Some(unknown) = acknowledged
    .iter()
    .find(|id| !definition.acknowledgements.iter().any(|a| &a.id == *id))
  {
    return Err(Error::InvalidAnswer {
      field:  unknown.clone(),
      reason: "no such acknowledgement on this circular".into(),
    });
  }

  for (id, value) in answers {
    let field = definition.field(id).ok_or_else(|| Error::InvalidAnswer {
      field:  id.clone(),
      reason: "no such field on this circular".into(),
    })?;

    match (&field.kind, value) {
      (FieldKind::Text, AnswerValue::Text(_))
      | (FieldKind::Boolean, AnswerValue::Boolean(_)) => {}
      (FieldKind::Choice { options }, AnswerValue::Choice(choice)) => {
        if !value.is_empty() && !options.contains(choice) {
          return Err(Error::InvalidAnswer {
            field:  id.clone(),
            reason: format!("{choice:?} is not one of the options"),
          });
        }
      }
      (kind, value) => {
        return Err(Error::InvalidAnswer {
          field:  id.clone(),
          reason: format!(
            "expected a {} answer, got {}",
            kind.name(),
            value.kind_name()
          ),
        });
      }
    }
  }

  Ok(())
}

/// Acknowledgements are a set: sorted, without duplicates.
pub fn normalize_acknowledged(mut acknowledged: Vec<String>) -> Vec<String> {
  acknowledged.sort_unstable();
  acknowledged.dedup();
  acknowledged
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::definition::{Acknowledgement, CustomField};

  fn definition() -> CircularDefinition {
    CircularDefinition {
      activity_id:        Uuid::new_v4(),
      template_ref:       "summer-camp".into(),
      fields:             vec![
        CustomField {
          id:       "allergy_ack".into(),
          label:    "I have reported all allergies".into(),
          kind:     FieldKind::Text,
          required: true,
        },
        CustomField {
          id:       "swims".into(),
          label:    "Can swim".into(),
          kind:     FieldKind::Boolean,
          required: true,
        },
        CustomField {
          id:       "bus".into(),
          label:    "Transport".into(),
          kind:     FieldKind::Choice {
            options: vec!["bus".into(), "own".into()],
          },
          required: false,
        },
      ],
      acknowledgements:   vec![Acknowledgement {
        id:   "photos".into(),
        text: "Photos may be taken during the activity".into(),
      }],
      signature_deadline: None,
      updated_at:         Utc::now(),
    }
  }

  fn complete() -> Answers {
    Answers::from([
      ("allergy_ack".into(), AnswerValue::Text("none".into())),
      ("swims".into(), AnswerValue::Boolean(false)),
    ])
  }

  #[test]
  fn complete_form_passes() {
    validate(&definition(), &complete(), &["photos".into()]).unwrap();
  }

  #[test]
  fn missing_fields_and_acknowledgements_are_listed() {
    let err = validate(&definition(), &Answers::new(), &[]).unwrap_err();
    match err {
      Error::IncompleteForm { missing } => {
        assert_eq!(missing, ["allergy_ack", "swims", "photos"]);
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn blank_text_counts_as_missing() {
    let mut answers = complete();
    answers.insert("allergy_ack".into(), AnswerValue::Text("   ".into()));
    let err = validate(&definition(), &answers, &["photos".into()]).unwrap_err();
    assert!(matches!(err, Error::IncompleteForm { missing } if missing == ["allergy_ack"]));
  }

  #[test]
  fn kind_mismatch_is_rejected() {
    let mut answers = complete();
    answers.insert("swims".into(), AnswerValue::Text("yes".into()));
    let err = validate(&definition(), &answers, &["photos".into()]).unwrap_err();
    assert!(matches!(err, Error::InvalidAnswer { field, .. } if field == "swims"));
  }

  #[test]
  fn unknown_choice_is_rejected() {
    let mut answers = complete();
    answers.insert("bus".into(), AnswerValue::Choice("train".into()));
    let err = validate(&definition(), &answers, &["photos".into()]).unwrap_err();
    assert!(matches!(err, Error::InvalidAnswer { field, .. } if field == "bus"));
  }

  #[test]
  fn unknown_field_is_rejected() {
    let mut answers = complete();
    answers.insert("shoe_size".into(), AnswerValue::Text("38".into()));
    let err = validate(&definition(), &answers, &["photos".into()]).unwrap_err();
    assert!(matches!(err, Error::InvalidAnswer { field, .. } if field == "shoe_size"));
  }

  #[test]
  fn unknown_acknowledgement_is_rejected() {
    let err = validate(&definition(), &complete(), &["photos".into(), "tattoos".into()])
      .unwrap_err();
    assert!(matches!(err, Error::InvalidAnswer { field, .. } if field == "tattoos"));
  }

  #[test]
  fn acknowledgements_normalize_to_a_sorted_set() {
    let acks = normalize_acknowledged(vec!["rules".into(), "photos".into(), "rules".into()]);
    assert_eq!(acks, ["photos", "rules"]);
  }

  #[test]
  fn answers_serialize_as_tagged_values() {
    let json = serde_json::to_value(AnswerValue::Boolean(true)).unwrap();
    assert_eq!(json, serde_json::json!({ "type": "boolean", "value": true }));
  }
}
