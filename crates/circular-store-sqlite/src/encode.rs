//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`.
//! Structured fields are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings. State enums use their
//! `SCREAMING_SNAKE_CASE` names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use circular_core::{
  activity::Activity,
  attendance::{AttendanceConfirmation, AttendanceState},
  definition::CircularDefinition,
  directory::Participant,
  health::{EmergencyContact, HealthProfile, HealthRecord},
  response::{
    CircularResponse, CircularState, DocumentRef, PaymentStatus, ResponseEvent,
    ResponseEventKind,
  },
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

/// Decode a `strum`-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `activities` row.
pub struct RawActivity {
  pub activity_id:       String,
  pub title:             String,
  pub starts_at:         String,
  pub ends_at:           String,
  pub location:          Option<String>,
  pub sections:          String,
  pub requires_circular: bool,
}

impl RawActivity {
  pub const COLUMNS: &'static str =
    "activity_id, title, starts_at, ends_at, location, sections, requires_circular";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id:       row.get(0)?,
      title:             row.get(1)?,
      starts_at:         row.get(2)?,
      ends_at:           row.get(3)?,
      location:          row.get(4)?,
      sections:          row.get(5)?,
      requires_circular: row.get(6)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id:       decode_uuid(&self.activity_id)?,
      title:             self.title,
      starts_at:         decode_dt(&self.starts_at)?,
      ends_at:           decode_dt(&self.ends_at)?,
      location:          self.location,
      sections:          decode_json(&self.sections)?,
      requires_circular: self.requires_circular,
    })
  }
}

/// Raw strings read directly from a `circular_definitions` row.
pub struct RawDefinition {
  pub activity_id:        String,
  pub template_ref:       String,
  pub fields:             String,
  pub acknowledgements:   String,
  pub signature_deadline: Option<String>,
  pub updated_at:         String,
}

impl RawDefinition {
  pub fn into_definition(self) -> Result<CircularDefinition> {
    Ok(CircularDefinition {
      activity_id:        decode_uuid(&self.activity_id)?,
      template_ref:       self.template_ref,
      fields:             decode_json(&self.fields)?,
      acknowledgements:   decode_json(&self.acknowledgements)?,
      signature_deadline: self.signature_deadline.as_deref().map(decode_dt).transpose()?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `participants` row.
pub struct RawParticipant {
  pub participant_id: String,
  pub name:           String,
  pub surname:        String,
  pub birth_date:     String,
  pub section:        String,
}

impl RawParticipant {
  pub const COLUMNS: &'static str = "participant_id, name, surname, birth_date, section";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      participant_id: row.get(0)?,
      name:           row.get(1)?,
      surname:        row.get(2)?,
      birth_date:     row.get(3)?,
      section:        row.get(4)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      participant_id: decode_uuid(&self.participant_id)?,
      name:           self.name,
      surname:        self.surname,
      birth_date:     decode_date(&self.birth_date)?,
      section:        self.section,
    })
  }
}

/// Raw strings read from `health_profiles` plus its contact rows.
pub struct RawHealth {
  pub participant_id:  String,
  pub allergies:       String,
  pub medications:     String,
  pub medical_notes:   Option<String>,
  pub last_updated_at: String,
  pub contacts:        Vec<EmergencyContact>,
}

impl RawHealth {
  pub fn into_record(self) -> Result<HealthRecord> {
    Ok(HealthRecord {
      profile:  HealthProfile {
        participant_id:  decode_uuid(&self.participant_id)?,
        allergies:       decode_json(&self.allergies)?,
        medications:     decode_json(&self.medications)?,
        medical_notes:   self.medical_notes,
        last_updated_at: decode_dt(&self.last_updated_at)?,
      },
      contacts: self.contacts,
    })
  }
}

/// Raw strings read directly from a `circular_responses` row.
pub struct RawResponse {
  pub response_id:       String,
  pub activity_id:       String,
  pub participant_id:    String,
  pub guardian_id:       String,
  pub answers:           String,
  pub acknowledged:      String,
  pub signature_ref:     String,
  pub signed_at:         String,
  pub state:             String,
  pub verification:      Option<String>,
  pub rejection:         Option<String>,
  pub document_id:       Option<String>,
  pub document_url:      Option<String>,
  pub payment_status:    String,
  pub health_profile_at: Option<String>,
  pub version:           u32,
}

impl RawResponse {
  pub const COLUMNS: &'static str = "response_id, activity_id, participant_id, guardian_id, \
     answers, acknowledged, signature_ref, signed_at, state, verification, \
     rejection, document_id, document_url, payment_status, health_profile_at, \
     version";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      response_id:       row.get(0)?,
      activity_id:       row.get(1)?,
      participant_id:    row.get(2)?,
      guardian_id:       row.get(3)?,
      answers:           row.get(4)?,
      acknowledged:      row.get(5)?,
      signature_ref:     row.get(6)?,
      signed_at:         row.get(7)?,
      state:             row.get(8)?,
      verification:      row.get(9)?,
      rejection:         row.get(10)?,
      document_id:       row.get(11)?,
      document_url:      row.get(12)?,
      payment_status:    row.get(13)?,
      health_profile_at: row.get(14)?,
      version:           row.get(15)?,
    })
  }

  pub fn into_response(self) -> Result<CircularResponse> {
    let document = match (self.document_id, self.document_url) {
      (Some(document_id), Some(url)) => Some(DocumentRef { document_id, url }),
      _ => None,
    };

    Ok(CircularResponse {
      response_id: decode_uuid(&self.response_id)?,
      activity_id: decode_uuid(&self.activity_id)?,
      participant_id: decode_uuid(&self.participant_id)?,
      guardian_id: decode_uuid(&self.guardian_id)?,
      answers: decode_json(&self.answers)?,
      acknowledged: decode_json(&self.acknowledged)?,
      signature_ref: self.signature_ref,
      signed_at: decode_dt(&self.signed_at)?,
      state: decode_enum::<CircularState>("state", &self.state)?,
      verification: self.verification.as_deref().map(decode_json).transpose()?,
      rejection: self.rejection.as_deref().map(decode_json).transpose()?,
      document,
      payment_status: decode_enum::<PaymentStatus>("payment_status", &self.payment_status)?,
      health_profile_at: self.health_profile_at.as_deref().map(decode_dt).transpose()?,
      version: self.version,
    })
  }
}

/// A response flattened into owned column values, ready to bind.
pub struct ResponseRow {
  pub response_id:       String,
  pub activity_id:       String,
  pub participant_id:    String,
  pub guardian_id:       String,
  pub answers:           String,
  pub acknowledged:      String,
  pub signature_ref:     String,
  pub signed_at:         String,
  pub state:             String,
  pub verification:      Option<String>,
  pub rejection:         Option<String>,
  pub document_id:       Option<String>,
  pub document_url:      Option<String>,
  pub payment_status:    String,
  pub health_profile_at: Option<String>,
  pub version:           u32,
}

impl ResponseRow {
  pub fn encode(r: &CircularResponse) -> Result<Self> {
    Ok(Self {
      response_id:       encode_uuid(r.response_id),
      activity_id:       encode_uuid(r.activity_id),
      participant_id:    encode_uuid(r.participant_id),
      guardian_id:       encode_uuid(r.guardian_id),
      answers:           encode_json(&r.answers)?,
      acknowledged:      encode_json(&r.acknowledged)?,
      signature_ref:     r.signature_ref.clone(),
      signed_at:         encode_dt(r.signed_at),
      state:             r.state.to_string(),
      verification:      r.verification.as_ref().map(encode_json).transpose()?,
      rejection:         r.rejection.as_ref().map(encode_json).transpose()?,
      document_id:       r.document.as_ref().map(|d| d.document_id.clone()),
      document_url:      r.document.as_ref().map(|d| d.url.clone()),
      payment_status:    r.payment_status.to_string(),
      health_profile_at: r.health_profile_at.map(encode_dt),
      version:           r.version,
    })
  }
}

/// Raw strings read directly from a `response_events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub response_id: String,
  pub payload:     String,
  pub recorded_at: String,
}

impl RawEvent {
  pub fn into_event(self) -> Result<ResponseEvent> {
    Ok(ResponseEvent {
      event_id:    decode_uuid(&self.event_id)?,
      response_id: decode_uuid(&self.response_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      kind:        decode_json::<ResponseEventKind>(&self.payload)?,
    })
  }
}

/// Owned column values for a `response_events` insert.
pub struct EventRow {
  pub event_id:    String,
  pub response_id: String,
  pub kind:        &'static str,
  pub payload:     String,
  pub recorded_at: String,
}

impl EventRow {
  pub fn encode(e: &ResponseEvent) -> Result<Self> {
    Ok(Self {
      event_id:    encode_uuid(e.event_id),
      response_id: encode_uuid(e.response_id),
      kind:        e.kind.discriminant(),
      payload:     encode_json(&e.kind)?,
      recorded_at: encode_dt(e.recorded_at),
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO response_events (event_id, response_id, kind, payload, recorded_at)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        self.event_id,
        self.response_id,
        self.kind,
        self.payload,
        self.recorded_at,
      ],
    )?;
    Ok(())
  }
}

/// Raw strings read directly from an `attendance_confirmations` row.
pub struct RawAttendance {
  pub confirmation_id: String,
  pub activity_id:     String,
  pub participant_id:  String,
  pub state:           String,
  pub comment:         Option<String>,
  pub decided_at:      Option<String>,
  pub decided_by:      Option<String>,
}

impl RawAttendance {
  pub const COLUMNS: &'static str =
    "confirmation_id, activity_id, participant_id, state, comment, decided_at, decided_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      confirmation_id: row.get(0)?,
      activity_id:     row.get(1)?,
      participant_id:  row.get(2)?,
      state:           row.get(3)?,
      comment:         row.get(4)?,
      decided_at:      row.get(5)?,
      decided_by:      row.get(6)?,
    })
  }

  pub fn into_confirmation(self) -> Result<AttendanceConfirmation> {
    Ok(AttendanceConfirmation {
      confirmation_id: decode_uuid(&self.confirmation_id)?,
      activity_id:     decode_uuid(&self.activity_id)?,
      participant_id:  decode_uuid(&self.participant_id)?,
      state:           decode_enum::<AttendanceState>("state", &self.state)?,
      comment:         self.comment,
      decided_at:      self.decided_at.as_deref().map(decode_dt).transpose()?,
      decided_by:      self.decided_by.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_state_is_a_decode_error() {
    let err = decode_enum::<CircularState>("state", "SHREDDED").unwrap_err();
    assert!(matches!(err, Error::Decode { column: "state", .. }));
  }

  #[test]
  fn dates_roundtrip_in_iso_format() {
    let d = NaiveDate::from_ymd_opt(2014, 2, 28).unwrap();
    assert_eq!(encode_date(d), "2014-02-28");
    assert_eq!(decode_date("2014-02-28").unwrap(), d);
  }
}
