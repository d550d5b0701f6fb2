//! JSON API for the circular consent workflow.
//!
//! Exposes an axum [`Router`] backed by a [`Portal`]. Authentication happens
//! in front of this router; the caller's identity arrives in the
//! `X-Actor-Role` / `X-Actor-Id` headers (see [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", circular_api::api_router(portal.clone()))
//! ```

pub mod activities;
pub mod actor;
pub mod attendance;
pub mod error;
pub mod etag;
pub mod forms;
pub mod health;
pub mod responses;
pub mod review;

use axum::{
  Router,
  routing::{get, post, put},
};
use circular_core::{
  directory::ParticipantDirectory, document::DocumentGenerator, store::CircularStore,
};
use circular_workflow::Portal;

pub use error::ApiError;

/// Build a fully-materialised API router for `portal`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, D, G>(portal: Portal<S, D, G>) -> Router<()>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Router::new()
    // Guardian forms
    .route("/form", get(forms::form::<S, D, G>))
    .route("/sign", post(forms::sign::<S, D, G>))
    // Staff review
    .route("/pending", get(review::pending::<S, D, G>))
    .route("/verify/{response_id}", post(review::verify::<S, D, G>))
    .route("/reject/{response_id}", post(review::reject::<S, D, G>))
    .route("/stats", get(review::stats::<S, D, G>))
    // Responses
    .route("/responses/{response_id}", get(responses::get_one::<S, D, G>))
    .route("/responses/{response_id}/history", get(responses::history::<S, D, G>))
    .route("/responses/{response_id}/document", post(responses::retry_document::<S, D, G>))
    .route("/responses/{response_id}/payment", put(responses::set_payment::<S, D, G>))
    // Attendance
    .route("/confirm-attendance", post(attendance::confirm::<S, D, G>))
    .route("/modify-attendance/{confirmation_id}", put(attendance::modify::<S, D, G>))
    .route("/attendance", get(attendance::list::<S, D, G>))
    // Health
    .route(
      "/health/{participant_id}",
      get(health::get_one::<S, D, G>).put(health::replace::<S, D, G>),
    )
    // Authoring
    .route("/activities/{activity_id}", put(activities::put_activity::<S, D, G>))
    .route(
      "/activities/{activity_id}/circular",
      get(activities::get_circular::<S, D, G>).put(activities::put_circular::<S, D, G>),
    )
    .with_state(portal)
}

#[cfg(test)]
mod tests;
