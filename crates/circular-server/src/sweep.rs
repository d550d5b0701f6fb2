//! Periodic retry of document generation for responses left in
//! `SIGNED_DOCUMENT_PENDING`.

use std::time::Duration;

use circular_core::{
  directory::ParticipantDirectory, document::DocumentGenerator, store::CircularStore,
};
use circular_workflow::Portal;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Spawn a task sweeping pending documents every `period`. Errors are
/// logged and the next tick tries again.
pub fn spawn_sweeper<S, D, G>(portal: Portal<S, D, G>, period: Duration) -> JoinHandle<()>
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      if let Err(e) = portal.sweep_pending_documents().await {
        tracing::warn!(error = %e, "pending document sweep failed");
      }
    }
  })
}
