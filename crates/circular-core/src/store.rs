//! The `CircularStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `circular-store-sqlite`).
//! The workflow layer depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::Activity,
  attendance::AttendanceConfirmation,
  definition::CircularDefinition,
  health::HealthRecord,
  response::{CircularResponse, CircularState, ResponseEvent},
};

/// Abstraction over the persistence of the circular workflow.
///
/// Response writes are compare-and-swap on [`CircularResponse::version`];
/// the response event log is append-only.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CircularStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Activities & definitions ──────────────────────────────────────────

  fn get_activity(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Insert or replace an activity. Once any response exists only `title`
  /// and `location` may change; returns `false` (and writes nothing) when
  /// any other field differs from the stored row.
  fn put_activity(
    &self,
    activity: Activity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_definition(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Option<CircularDefinition>, Self::Error>> + Send + '_;

  /// Insert or replace a definition unless any response exists for the
  /// activity. Returns `false` (and writes nothing) when frozen.
  fn put_definition(
    &self,
    definition: CircularDefinition,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Whether any response exists for the activity.
  fn has_responses(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Health ────────────────────────────────────────────────────────────

  fn get_health(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<HealthRecord>, Self::Error>> + Send + '_;

  /// Atomically replace the profile and the whole contact list.
  fn put_health(
    &self,
    record: HealthRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Responses ─────────────────────────────────────────────────────────

  fn get_response(
    &self,
    response_id: Uuid,
  ) -> impl Future<Output = Result<Option<CircularResponse>, Self::Error>> + Send + '_;

  fn find_response(
    &self,
    activity_id: Uuid,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<CircularResponse>, Self::Error>> + Send + '_;

  fn list_responses(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CircularResponse>, Self::Error>> + Send + '_;

  /// Responses in any of `states`, across all activities.
  fn list_responses_in_state(
    &self,
    states: Vec<CircularState>,
  ) -> impl Future<Output = Result<Vec<CircularResponse>, Self::Error>> + Send + '_;

  /// Write `response` and append `event` in one transaction.
  ///
  /// `expected_version` is the version the caller read: `None` means the row
  /// must not exist yet. Returns `false` (and writes nothing) when the stored
  /// row does not match.
  fn commit_response(
    &self,
    response: CircularResponse,
    expected_version: Option<u32>,
    event: ResponseEvent,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Append an event without touching the response row.
  fn append_event(
    &self,
    event: ResponseEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The response's history, oldest first.
  fn list_events(
    &self,
    response_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ResponseEvent>, Self::Error>> + Send + '_;

  // ── Signature images ──────────────────────────────────────────────────

  /// Store an image under its content address. Storing the same reference
  /// twice is a no-op.
  fn put_signature(
    &self,
    signature_ref: String,
    bytes: Vec<u8>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_signature(
    &self,
    signature_ref: String,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  fn get_attendance(
    &self,
    confirmation_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceConfirmation>, Self::Error>> + Send + '_;

  fn find_attendance(
    &self,
    activity_id: Uuid,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceConfirmation>, Self::Error>> + Send + '_;

  fn list_attendance(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AttendanceConfirmation>, Self::Error>> + Send + '_;

  /// Insert or update by `(activity_id, participant_id)`. Returns the stored
  /// row, whose `confirmation_id` is the existing one on update.
  fn save_attendance(
    &self,
    confirmation: AttendanceConfirmation,
  ) -> impl Future<Output = Result<AttendanceConfirmation, Self::Error>> + Send + '_;
}
