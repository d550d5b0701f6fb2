//! Health profiles and emergency contacts.
//!
//! A participant has at most one health profile, shared read-only by every
//! activity. Updates replace the profile and the whole contact list at once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Profiles older than this are flagged to the guardian as needing review.
pub const STALE_AFTER_DAYS: i64 = 180;

/// Medical data for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProfile {
  pub participant_id:  Uuid,
  pub allergies:       Vec<String>,
  pub medications:     Vec<String>,
  pub medical_notes:   Option<String>,
  /// Server-assigned on every write.
  pub last_updated_at: DateTime<Utc>,
}

impl HealthProfile {
  pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
    now - self.last_updated_at > Duration::days(STALE_AFTER_DAYS)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
  pub name:       String,
  pub phone:      String,
  /// Free text, e.g. "mother", "neighbour".
  pub relation:   String,
  #[serde(default)]
  pub is_primary: bool,
}

/// A profile together with its contacts, as read from or written to the
/// store in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
  pub profile:  HealthProfile,
  pub contacts: Vec<EmergencyContact>,
}

/// Input to a health-profile write. The timestamp is never accepted from
/// callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProfileUpdate {
  #[serde(default)]
  pub allergies:     Vec<String>,
  #[serde(default)]
  pub medications:   Vec<String>,
  pub medical_notes: Option<String>,
  #[serde(default)]
  pub contacts:      Vec<EmergencyContact>,
}

impl HealthProfileUpdate {
  /// Contacts need a name and a phone number; at most one may be primary.
  pub fn validate(&self) -> Result<()> {
    if let Some(c) = self
      .contacts
      .iter()
      .find(|c| c.name.trim().is_empty() || c.phone.trim().is_empty())
    {
      return Err(Error::InvalidHealthProfile(format!(
        "emergency contact {:?} needs both a name and a phone number",
        c.name
      )));
    }

    let primaries = self.contacts.iter().filter(|c| c.is_primary).count();
    if primaries > 1 {
      return Err(Error::InvalidHealthProfile(format!(
        "{primaries} emergency contacts are marked primary; at most one may be"
      )));
    }

    Ok(())
  }

  /// Turn the update into a full record stamped at `now`.
  pub fn into_record(self, participant_id: Uuid, now: DateTime<Utc>) -> HealthRecord {
    HealthRecord {
      profile:  HealthProfile {
        participant_id,
        allergies: self.allergies,
        medications: self.medications,
        medical_notes: self.medical_notes,
        last_updated_at: now,
      },
      contacts: self.contacts,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn contact(name: &str, primary: bool) -> EmergencyContact {
    EmergencyContact {
      name:       name.into(),
      phone:      "+34 600 000 000".into(),
      relation:   "aunt".into(),
      is_primary: primary,
    }
  }

  fn profile(last_updated_at: DateTime<Utc>) -> HealthProfile {
    HealthProfile {
      participant_id: Uuid::nil(),
      allergies: vec![],
      medications: vec![],
      medical_notes: None,
      last_updated_at,
    }
  }

  #[test]
  fn staleness_boundary() {
    let updated = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let profile = profile(updated);

    assert!(!profile.is_stale_at(updated + Duration::days(STALE_AFTER_DAYS)));
    assert!(profile.is_stale_at(
      updated + Duration::days(STALE_AFTER_DAYS) + Duration::seconds(1)
    ));
    assert!(profile.is_stale_at(updated + Duration::days(200)));
  }

  #[test]
  fn two_primary_contacts_are_rejected() {
    let update = HealthProfileUpdate {
      contacts: vec![contact("Ana", true), contact("Luis", true)],
      ..Default::default()
    };
    assert!(matches!(update.validate(), Err(Error::InvalidHealthProfile(_))));
  }

  #[test]
  fn zero_or_one_primary_is_fine() {
    let none = HealthProfileUpdate {
      contacts: vec![contact("Ana", false), contact("Luis", false)],
      ..Default::default()
    };
    none.validate().unwrap();

    let one = HealthProfileUpdate {
      contacts: vec![contact("Ana", true), contact("Luis", false)],
      ..Default::default()
    };
    one.validate().unwrap();
  }

  #[test]
  fn contact_without_phone_is_rejected() {
    let mut c = contact("Ana", false);
    c.phone = " ".into();
    let update = HealthProfileUpdate { contacts: vec![c], ..Default::default() };
    assert!(matches!(update.validate(), Err(Error::InvalidHealthProfile(_))));
  }

  #[test]
  fn into_record_stamps_timestamp() {
    let now = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
    let id = Uuid::new_v4();
    let record = HealthProfileUpdate {
      allergies: vec!["peanuts".into()],
      ..Default::default()
    }
    .into_record(id, now);
    assert_eq!(record.profile.participant_id, id);
    assert_eq!(record.profile.last_updated_at, now);
    assert_eq!(record.profile.allergies, ["peanuts"]);
  }
}
