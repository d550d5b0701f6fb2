//! In-process mutual exclusion per `(activity_id, participant_id)`.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Clone, Default)]
pub(crate) struct PairLocks {
  slots: Arc<Mutex<HashMap<(Uuid, Uuid), Slot>>>,
}

impl PairLocks {
  /// Wait for exclusive access to the pair. Released when the guard drops.
  pub(crate) async fn acquire(
    &self,
    activity_id: Uuid,
    participant_id: Uuid,
  ) -> OwnedMutexGuard<()> {
    let slot = {
      let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
      // A slot referenced only by the map has no holder and no waiter.
      slots.retain(|_, slot| Arc::strong_count(slot) > 1);
      slots.entry((activity_id, participant_id)).or_default().clone()
    };
    slot.lock_owned().await
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn same_pair_is_exclusive() {
    let locks = PairLocks::default();
    let (a, p) = (Uuid::new_v4(), Uuid::new_v4());

    let guard = locks.acquire(a, p).await;
    let waiting = tokio::time::timeout(Duration::from_millis(20), locks.acquire(a, p)).await;
    assert!(waiting.is_err());

    drop(guard);
    let _again = locks.acquire(a, p).await;
  }

  #[tokio::test]
  async fn different_pairs_do_not_block() {
    let locks = PairLocks::default();
    let a = Uuid::new_v4();

    let _first = locks.acquire(a, Uuid::new_v4()).await;
    let second =
      tokio::time::timeout(Duration::from_millis(20), locks.acquire(a, Uuid::new_v4())).await;
    assert!(second.is_ok());
  }

  #[tokio::test]
  async fn idle_slots_are_pruned() {
    let locks = PairLocks::default();
    for _ in 0..10 {
      drop(locks.acquire(Uuid::new_v4(), Uuid::new_v4()).await);
    }
    let _held = locks.acquire(Uuid::new_v4(), Uuid::new_v4()).await;
    assert_eq!(locks.len(), 1);
  }
}
