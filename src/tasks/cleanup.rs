//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired cache entries, so
//! staleness is bounded by the sweep interval even for keys nobody reads.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::notify::{CacheSnapshot, SubscriberRegistry};

/// Spawns the recurring expiry sweeper.
///
/// The task sleeps for the configured interval, then removes every entry
/// past its expiry and notifies subscribers when anything was removed.
/// Write locks are held only for the sweep itself, never across the
/// sleep. The returned handle is aborted by `destroy()`.
///
/// # Arguments
/// * `store` - Shared entry store
/// * `subscribers` - Registry to notify after a non-empty sweep
/// * `interval_ms` - Milliseconds between sweeps
pub fn spawn_sweeper(
    store: Arc<RwLock<CacheStore>>,
    subscribers: Arc<SubscriberRegistry>,
    interval_ms: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_millis(interval_ms);

    tokio::spawn(async move {
        info!("expiry sweeper started with interval of {}ms", interval_ms);

        loop {
            tokio::time::sleep(interval).await;

            let (removed, snapshot) = {
                let mut guard = store.write();
                let removed = guard.cleanup_expired();
                (removed, CacheSnapshot::capture(&guard))
            };

            if removed > 0 {
                info!("expiry sweep removed {} entries", removed);
                subscribers.notify(&snapshot);
            } else {
                debug!("expiry sweep found no expired entries");
            }
        }
    })
}
