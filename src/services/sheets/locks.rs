use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use super::Tab;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum LockKey {
    Day(String, String),
    Tab(String, Tab),
}

/// In-process write locks for one store.
///
/// A day lock covers claims on the slots of one date. A tab lock covers any
/// read followed by an update or delete: Google row handles are positions, and
/// a delete renumbers every row below it. Callers that need both take the day
/// locks first. Nothing here coordinates with other server instances.
#[derive(Default)]
pub struct WriteLocks {
    inner: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl WriteLocks {
    async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn day(&self, sheet_id: &str, date: &str) -> OwnedMutexGuard<()> {
        self.acquire(LockKey::Day(sheet_id.to_string(), date.to_string()))
            .await
    }

    /// Locks two days in a fixed order so concurrent reschedules cannot deadlock.
    pub async fn days(
        &self,
        sheet_id: &str,
        a: &str,
        b: &str,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        if a == b {
            return (self.day(sheet_id, a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let g1 = self.day(sheet_id, first).await;
        let g2 = self.day(sheet_id, second).await;
        (g1, Some(g2))
    }

    pub async fn tab(&self, sheet_id: &str, tab: Tab) -> OwnedMutexGuard<()> {
        self.acquire(LockKey::Tab(sheet_id.to_string(), tab)).await
    }
}
