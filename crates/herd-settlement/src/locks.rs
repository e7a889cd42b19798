//! Per-asset serialization.
//!
//! Two settlements of the same asset must never run concurrently, or both
//! could observe a non-terminal state and both disburse. Different assets
//! settle in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per asset id.
#[derive(Debug, Default)]
pub struct AssetLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `asset_id`. Released when the guard drops.
    pub async fn acquire(&self, asset_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Drop entries nobody holds or waits on.
            map.retain(|id, lock| id == asset_id || Arc::strong_count(lock) > 1);
            map.entry(asset_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked asset ids.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
