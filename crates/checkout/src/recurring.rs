use locksmith::{LockReader, LocksmithError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use unlock_dash_core::recurring::RecurringEligibility;

type Key = (u64, String);

/// Recurring-payment eligibility per lock, fetched at most once per lock at a time.
///
/// Concurrent lookups for the same lock share one in-flight request. Successful
/// results are kept; a failed lookup leaves the slot empty so the next caller retries.
pub struct RecurringCache {
    reader: Arc<dyn LockReader + 'static>,
    entries: Mutex<HashMap<Key, Arc<OnceCell<RecurringEligibility>>>>,
}

impl RecurringCache {
    pub fn new(reader: Arc<dyn LockReader + 'static>) -> Arc<Self> {
        Arc::new(Self {
            reader,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub async fn get(&self, network: u64, lock: &str) -> Result<RecurringEligibility, LocksmithError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry((network, lock.to_lowercase())).or_default())
        };
        let eligibility = cell
            .get_or_try_init(|| async {
                let details = self.reader.lock_details(network, lock).await?;
                let eligibility = RecurringEligibility::for_lock(&details);
                tracing::debug!(
                    network,
                    lock,
                    possible = eligibility.is_recurring_possible,
                    "Resolved recurring eligibility"
                );
                Ok::<_, LocksmithError>(eligibility)
            })
            .await?;
        Ok(*eligibility)
    }

    /// Previously resolved eligibility, without fetching.
    pub async fn cached(&self, network: u64, lock: &str) -> Option<RecurringEligibility> {
        let entries = self.entries.lock().await;
        entries
            .get(&(network, lock.to_lowercase()))
            .and_then(|cell| cell.get().copied())
    }
}
