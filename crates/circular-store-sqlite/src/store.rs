//! [`SqliteStore`]: the SQLite implementation of [`CircularStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use circular_core::{
  activity::Activity,
  attendance::AttendanceConfirmation,
  definition::CircularDefinition,
  health::{EmergencyContact, HealthRecord},
  response::{CircularResponse, CircularState, ResponseEvent},
  store::CircularStore,
};

use crate::{
  Result,
  encode::{
    EventRow, RawActivity, RawAttendance, RawDefinition, RawEvent, RawHealth,
    RawResponse, ResponseRow, encode_dt, encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A circular store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_responses(
    &self,
    where_clause: &'static str,
    param: String,
  ) -> Result<Vec<CircularResponse>> {
    let raws: Vec<RawResponse> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM circular_responses WHERE {where_clause} ORDER BY signed_at",
          RawResponse::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawResponse::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResponse::into_response).collect()
  }

  async fn query_attendance(
    &self,
    where_clause: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<AttendanceConfirmation>> {
    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM attendance_confirmations WHERE {where_clause}",
          RawAttendance::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(params.iter()),
            RawAttendance::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_confirmation).collect()
  }
}

// ─── CircularStore impl ──────────────────────────────────────────────────────

impl CircularStore for SqliteStore {
  type Error = crate::Error;

  // ── Activities & definitions ──────────────────────────────────────────────

  async fn get_activity(&self, activity_id: Uuid) -> Result<Option<Activity>> {
    let id_str = encode_uuid(activity_id);

    let raw: Option<RawActivity> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM activities WHERE activity_id = ?1",
          RawActivity::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawActivity::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawActivity::into_activity).transpose()
  }

  async fn put_activity(&self, activity: Activity) -> Result<bool> {
    let id_str       = encode_uuid(activity.activity_id);
    let starts_str   = encode_dt(activity.starts_at);
    let ends_str     = encode_dt(activity.ends_at);
    let sections_str = encode_json(&activity.sections)?;

    // With responses on file the update only goes through when the
    // roster-defining columns are unchanged.
    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO activities (
             activity_id, title, starts_at, ends_at, location, sections, requires_circular
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(activity_id) DO UPDATE SET
             title             = excluded.title,
             starts_at         = excluded.starts_at,
             ends_at           = excluded.ends_at,
             location          = excluded.location,
             sections          = excluded.sections,
             requires_circular = excluded.requires_circular
           WHERE NOT EXISTS (
               SELECT 1 FROM circular_responses WHERE activity_id = excluded.activity_id
             )
             OR (    activities.starts_at         = excluded.starts_at
                 AND activities.ends_at           = excluded.ends_at
                 AND activities.sections          = excluded.sections
                 AND activities.requires_circular = excluded.requires_circular)",
          rusqlite::params![
            id_str,
            activity.title,
            starts_str,
            ends_str,
            activity.location,
            sections_str,
            activity.requires_circular,
          ],
        )?;
        Ok(changed)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn get_definition(&self, activity_id: Uuid) -> Result<Option<CircularDefinition>> {
    let id_str = encode_uuid(activity_id);

    let raw: Option<RawDefinition> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT activity_id, template_ref, fields, acknowledgements,
                      signature_deadline, updated_at
               FROM circular_definitions WHERE activity_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawDefinition {
                  activity_id:        row.get(0)?,
                  template_ref:       row.get(1)?,
                  fields:             row.get(2)?,
                  acknowledgements:   row.get(3)?,
                  signature_deadline: row.get(4)?,
                  updated_at:         row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDefinition::into_definition).transpose()
  }

  async fn put_definition(&self, definition: CircularDefinition) -> Result<bool> {
    let id_str       = encode_uuid(definition.activity_id);
    let fields_str   = encode_json(&definition.fields)?;
    let acks_str     = encode_json(&definition.acknowledgements)?;
    let deadline_str = definition.signature_deadline.map(encode_dt);
    let updated_str  = encode_dt(definition.updated_at);

    // The frozen check and the write share one statement so a response
    // landing in between cannot slip past it.
    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO circular_definitions (
             activity_id, template_ref, fields, acknowledgements,
             signature_deadline, updated_at
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6
           WHERE NOT EXISTS (
             SELECT 1 FROM circular_responses WHERE activity_id = ?1
           )
           ON CONFLICT(activity_id) DO UPDATE SET
             template_ref       = excluded.template_ref,
             fields             = excluded.fields,
             acknowledgements   = excluded.acknowledgements,
             signature_deadline = excluded.signature_deadline,
             updated_at         = excluded.updated_at",
          rusqlite::params![
            id_str,
            definition.template_ref,
            fields_str,
            acks_str,
            deadline_str,
            updated_str,
          ],
        )?;
        Ok(changed)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn has_responses(&self, activity_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(activity_id);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM circular_responses WHERE activity_id = ?1 LIMIT 1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(exists)
  }

  // ── Health ────────────────────────────────────────────────────────────────

  async fn get_health(&self, participant_id: Uuid) -> Result<Option<HealthRecord>> {
    let id_str = encode_uuid(participant_id);

    let raw: Option<RawHealth> = self
      .conn
      .call(move |conn| {
        // Read profile and contacts inside one transaction so a concurrent
        // replace is never observed half-way.
        let tx = conn.transaction()?;

        let profile = tx
          .query_row(
            "SELECT participant_id, allergies, medications, medical_notes, last_updated_at
             FROM health_profiles WHERE participant_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawHealth {
                participant_id:  row.get(0)?,
                allergies:       row.get(1)?,
                medications:     row.get(2)?,
                medical_notes:   row.get(3)?,
                last_updated_at: row.get(4)?,
                contacts:        Vec::new(),
              })
            },
          )
          .optional()?;

        let Some(mut profile) = profile else {
          return Ok(None);
        };

        let mut stmt = tx.prepare(
          "SELECT name, phone, relation, is_primary
           FROM emergency_contacts WHERE participant_id = ?1
           ORDER BY position",
        )?;
        profile.contacts = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(EmergencyContact {
              name:       row.get(0)?,
              phone:      row.get(1)?,
              relation:   row.get(2)?,
              is_primary: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        tx.commit()?;

        Ok(Some(profile))
      })
      .await?;

    raw.map(RawHealth::into_record).transpose()
  }

  async fn put_health(&self, record: HealthRecord) -> Result<()> {
    let profile         = record.profile;
    let id_str          = encode_uuid(profile.participant_id);
    let allergies_str   = encode_json(&profile.allergies)?;
    let medications_str = encode_json(&profile.medications)?;
    let updated_str     = encode_dt(profile.last_updated_at);
    let contacts        = record.contacts;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO health_profiles (
             participant_id, allergies, medications, medical_notes, last_updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(participant_id) DO UPDATE SET
             allergies       = excluded.allergies,
             medications     = excluded.medications,
             medical_notes   = excluded.medical_notes,
             last_updated_at = excluded.last_updated_at",
          rusqlite::params![
            id_str,
            allergies_str,
            medications_str,
            profile.medical_notes,
            updated_str,
          ],
        )?;
        tx.execute(
          "DELETE FROM emergency_contacts WHERE participant_id = ?1",
          rusqlite::params![id_str],
        )?;
        for (position, c) in contacts.iter().enumerate() {
          tx.execute(
            "INSERT INTO emergency_contacts (
               participant_id, position, name, phone, relation, is_primary
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id_str, position as i64, c.name, c.phone, c.relation, c.is_primary],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Responses ─────────────────────────────────────────────────────────────

  async fn get_response(&self, response_id: Uuid) -> Result<Option<CircularResponse>> {
    Ok(
      self
        .query_responses("response_id = ?1", encode_uuid(response_id))
        .await?
        .pop(),
    )
  }

  async fn find_response(
    &self,
    activity_id:    Uuid,
    participant_id: Uuid,
  ) -> Result<Option<CircularResponse>> {
    let activity_str    = encode_uuid(activity_id);
    let participant_str = encode_uuid(participant_id);

    let raw: Option<RawResponse> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM circular_responses
           WHERE activity_id = ?1 AND participant_id = ?2",
          RawResponse::COLUMNS
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![activity_str, participant_str],
              RawResponse::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResponse::into_response).transpose()
  }

  async fn list_responses(&self, activity_id: Uuid) -> Result<Vec<CircularResponse>> {
    self
      .query_responses("activity_id = ?1", encode_uuid(activity_id))
      .await
  }

  async fn list_responses_in_state(
    &self,
    states: Vec<CircularState>,
  ) -> Result<Vec<CircularResponse>> {
    let names: Vec<String> = states.iter().map(ToString::to_string).collect();
    self
      .query_responses(
        "state IN (SELECT value FROM json_each(?1))",
        encode_json(&names)?,
      )
      .await
  }

  async fn commit_response(
    &self,
    response:         CircularResponse,
    expected_version: Option<u32>,
    event:            ResponseEvent,
  ) -> Result<bool> {
    let row   = ResponseRow::encode(&response)?;
    let event = EventRow::encode(&event)?;

    let committed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = match expected_version {
          None => tx.execute(
            "INSERT INTO circular_responses (
               response_id, activity_id, participant_id, guardian_id,
               answers, acknowledged, signature_ref, signed_at, state,
               verification, rejection, document_id, document_url,
               payment_status, health_profile_at, version
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT DO NOTHING",
            rusqlite::params![
              row.response_id,
              row.activity_id,
              row.participant_id,
              row.guardian_id,
              row.answers,
              row.acknowledged,
              row.signature_ref,
              row.signed_at,
              row.state,
              row.verification,
              row.rejection,
              row.document_id,
              row.document_url,
              row.payment_status,
              row.health_profile_at,
              row.version,
            ],
          )?,
          Some(expected) => tx.execute(
            "UPDATE circular_responses SET
               guardian_id       = ?2,
               answers           = ?3,
               acknowledged      = ?4,
               signature_ref     = ?5,
               signed_at         = ?6,
               state             = ?7,
               verification      = ?8,
               rejection         = ?9,
               document_id       = ?10,
               document_url      = ?11,
               payment_status    = ?12,
               health_profile_at = ?13,
               version           = ?14
             WHERE response_id = ?1 AND version = ?15",
            rusqlite::params![
              row.response_id,
              row.guardian_id,
              row.answers,
              row.acknowledged,
              row.signature_ref,
              row.signed_at,
              row.state,
              row.verification,
              row.rejection,
              row.document_id,
              row.document_url,
              row.payment_status,
              row.health_profile_at,
              row.version,
              expected,
            ],
          )?,
        };

        if changed == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }

        event.insert(&tx)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !committed {
      tracing::debug!(
        response_id = %response.response_id,
        ?expected_version,
        "response version check failed"
      );
    }
    Ok(committed)
  }

  async fn append_event(&self, event: ResponseEvent) -> Result<()> {
    let event = EventRow::encode(&event)?;
    self
      .conn
      .call(move |conn| {
        event.insert(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_events(&self, response_id: Uuid) -> Result<Vec<ResponseEvent>> {
    let id_str = encode_uuid(response_id);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, response_id, payload, recorded_at
           FROM response_events WHERE response_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawEvent {
              event_id:    row.get(0)?,
              response_id: row.get(1)?,
              payload:     row.get(2)?,
              recorded_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  // ── Signature images ──────────────────────────────────────────────────────

  async fn put_signature(&self, signature_ref: String, bytes: Vec<u8>) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO signature_blobs (signature_ref, bytes, stored_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(signature_ref) DO NOTHING",
          rusqlite::params![signature_ref, bytes, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_signature(&self, signature_ref: String) -> Result<Option<Vec<u8>>> {
    let bytes = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT bytes FROM signature_blobs WHERE signature_ref = ?1",
              rusqlite::params![signature_ref],
              |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(bytes)
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn get_attendance(
    &self,
    confirmation_id: Uuid,
  ) -> Result<Option<AttendanceConfirmation>> {
    Ok(
      self
        .query_attendance("confirmation_id = ?1", vec![encode_uuid(confirmation_id)])
        .await?
        .pop(),
    )
  }

  async fn find_attendance(
    &self,
    activity_id:    Uuid,
    participant_id: Uuid,
  ) -> Result<Option<AttendanceConfirmation>> {
    Ok(
      self
        .query_attendance(
          "activity_id = ?1 AND participant_id = ?2",
          vec![encode_uuid(activity_id), encode_uuid(participant_id)],
        )
        .await?
        .pop(),
    )
  }

  async fn list_attendance(&self, activity_id: Uuid) -> Result<Vec<AttendanceConfirmation>> {
    self
      .query_attendance("activity_id = ?1", vec![encode_uuid(activity_id)])
      .await
  }

  async fn save_attendance(
    &self,
    confirmation: AttendanceConfirmation,
  ) -> Result<AttendanceConfirmation> {
    let id_str          = encode_uuid(confirmation.confirmation_id);
    let activity_str    = encode_uuid(confirmation.activity_id);
    let participant_str = encode_uuid(confirmation.participant_id);
    let state_str       = confirmation.state.to_string();
    let comment         = confirmation.comment.clone();
    let decided_at_str  = confirmation.decided_at.map(encode_dt);
    let decided_by_str  = confirmation.decided_by.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO attendance_confirmations (
             confirmation_id, activity_id, participant_id, state,
             comment, decided_at, decided_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(activity_id, participant_id) DO UPDATE SET
             state      = excluded.state,
             comment    = excluded.comment,
             decided_at = excluded.decided_at,
             decided_by = excluded.decided_by",
          rusqlite::params![
            id_str,
            activity_str,
            participant_str,
            state_str,
            comment,
            decided_at_str,
            decided_by_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .find_attendance(confirmation.activity_id, confirmation.participant_id)
      .await?
      .ok_or_else(|| crate::Error::Decode {
        column: "confirmation_id",
        value:  confirmation.confirmation_id.to_string(),
      })
  }
}
