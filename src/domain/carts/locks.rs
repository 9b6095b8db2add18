//! Keyed async locks.

use std::{hash::Hash, sync::Arc};

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One mutex per key, created on demand. Slots nobody holds or waits on are
/// dropped the next time any key is locked.
#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
    slots: Mutex<FxHashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;

            slots.retain(|_, slot| Arc::strong_count(slot) > 1);

            Arc::clone(slots.entry(key.clone()).or_default())
        };

        slot.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::<u32>::default();

        let held = locks.lock(&1).await;

        let blocked = timeout(Duration::from_millis(20), locks.lock(&1)).await;

        assert!(blocked.is_err(), "second lock on the same key should wait");

        drop(held);

        let reacquired = timeout(Duration::from_millis(20), locks.lock(&1)).await;

        assert!(reacquired.is_ok(), "lock should be free after release");
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::<u32>::default();

        let _first = locks.lock(&1).await;
        let second = timeout(Duration::from_millis(20), locks.lock(&2)).await;

        assert!(second.is_ok(), "independent keys should not contend");
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = KeyedLocks::<u32>::default();

        drop(locks.lock(&1).await);
        drop(locks.lock(&2).await);

        let _held = locks.lock(&3).await;

        assert_eq!(locks.len().await, 1);
    }
}
