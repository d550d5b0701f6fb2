//! Local participant directory backed by the `participants` and
//! `guardian_links` tables.

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use circular_core::directory::{Participant, ParticipantDirectory};

use crate::{
  Result, SqliteStore,
  encode::{RawParticipant, encode_date, encode_json, encode_uuid},
};

impl SqliteStore {
  /// Insert or replace a participant in the local mirror.
  pub async fn add_participant(&self, participant: Participant) -> Result<()> {
    let id_str    = encode_uuid(participant.participant_id);
    let birth_str = encode_date(participant.birth_date);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO participants (participant_id, name, surname, birth_date, section)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(participant_id) DO UPDATE SET
             name       = excluded.name,
             surname    = excluded.surname,
             birth_date = excluded.birth_date,
             section    = excluded.section",
          rusqlite::params![
            id_str,
            participant.name,
            participant.surname,
            birth_str,
            participant.section,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record that `guardian_id` may act for `participant_id`.
  pub async fn link_guardian(
    &self,
    guardian_id:    Uuid,
    participant_id: Uuid,
    relation:       impl Into<String>,
  ) -> Result<()> {
    let guardian_str    = encode_uuid(guardian_id);
    let participant_str = encode_uuid(participant_id);
    let relation        = relation.into();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO guardian_links (guardian_id, participant_id, relation)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(guardian_id, participant_id) DO UPDATE SET
             relation = excluded.relation",
          rusqlite::params![guardian_str, participant_str, relation],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl ParticipantDirectory for SqliteStore {
  type Error = crate::Error;

  async fn resolve_participant(&self, participant_id: Uuid) -> Result<Option<Participant>> {
    let id_str = encode_uuid(participant_id);

    let raw: Option<RawParticipant> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM participants WHERE participant_id = ?1",
          RawParticipant::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawParticipant::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParticipant::into_participant).transpose()
  }

  async fn guardian_linked_to(&self, guardian_id: Uuid, participant_id: Uuid) -> Result<bool> {
    let guardian_str    = encode_uuid(guardian_id);
    let participant_str = encode_uuid(participant_id);

    let linked = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM guardian_links
               WHERE guardian_id = ?1 AND participant_id = ?2",
              rusqlite::params![guardian_str, participant_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(linked)
  }

  async fn list_participants(
    &self,
    sections: Vec<String>,
    section:  Option<String>,
  ) -> Result<Vec<Participant>> {
    let sections_str = encode_json(&sections)?;

    let raws: Vec<RawParticipant> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM participants
           WHERE section IN (SELECT value FROM json_each(?1))
             AND (?2 IS NULL OR section = ?2)
           ORDER BY surname, name",
          RawParticipant::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![sections_str, section], RawParticipant::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawParticipant::into_participant).collect()
  }
}
