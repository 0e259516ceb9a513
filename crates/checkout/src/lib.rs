mod recurring;

pub use recurring::RecurringCache;

use locksmith::IndexerApi;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use unlock_dash_core::models::{LockConfig, MetadataInput, RecurringPayments};
use unlock_dash_core::recurring::RecurringEligibility;
use unlock_dash_core::{checksum_address, same_address, AddressError, LockConfigStore, LockStoreError, Locks};

pub const DEFAULT_LOCK_NAME: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Store(#[from] LockStoreError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("lock {0} has no network configured")]
    MissingNetwork(String),
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;

pub type ChangeListener = Box<dyn Fn(&Locks) + Send + Sync>;

/// The lock section of a checkout config being edited.
///
/// Every successful edit replaces the store and hands the full lock mapping to the
/// change listener.
pub struct LocksForm {
    store: LockConfigStore,
    recurring: Arc<RecurringCache>,
    indexer: Arc<dyn IndexerApi + 'static>,
    account: Option<String>,
    on_change: ChangeListener,
}

impl LocksForm {
    pub fn new(
        defaults: Locks,
        recurring: Arc<RecurringCache>,
        indexer: Arc<dyn IndexerApi + 'static>,
        on_change: ChangeListener,
    ) -> Self {
        Self {
            store: LockConfigStore::from_defaults(defaults),
            recurring,
            indexer,
            account: None,
            on_change,
        }
    }

    /// Manager account whose locks provide default names.
    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account;
        self
    }

    pub fn store(&self) -> &LockConfigStore {
        &self.store
    }

    pub fn locks(&self) -> &Locks {
        self.store.locks()
    }

    fn commit(&mut self, store: LockConfigStore) {
        self.store = store;
        (self.on_change)(self.store.locks());
    }

    /// Add a lock, or update it when already present.
    ///
    /// A lock without a name takes the name the indexer knows for it, then `name`, then
    /// `"default"`. A lock without recurring payments defaults to one year of renewals when
    /// the lock supports them.
    pub async fn add_lock(
        &mut self,
        address: &str,
        network: u64,
        name: Option<&str>,
        fields: Option<LockConfig>,
    ) -> Result<()> {
        checksum_address(address)?;
        let mut fields = fields.unwrap_or_default();

        let existing = self.store.get(address);
        let has_name = fields.name.is_some() || existing.is_some_and(|lock| lock.name.is_some());
        let has_recurring = fields.recurring_payments.is_some()
            || existing.is_some_and(|lock| lock.recurring_payments.is_some());
        if !has_name {
            let indexed = self.indexed_name(network, address).await;
            fields.name = Some(
                indexed
                    .or_else(|| name.map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_LOCK_NAME.to_string()),
            );
        }

        if !has_recurring {
            fields.recurring_payments = self.default_recurring(network, address).await;
        }

        let store = self.store.add(address, network, fields);
        tracing::info!(network, lock = address, "Lock added to checkout config");
        self.commit(store);
        Ok(())
    }

    async fn indexed_name(&self, network: u64, address: &str) -> Option<String> {
        let account = self.account.as_deref()?;
        match self.indexer.locks_by_manager(network, account).await {
            Ok(locks) => locks
                .into_iter()
                .find(|lock| same_address(&lock.address, address))
                .and_then(|lock| lock.name),
            Err(err) => {
                tracing::warn!(network, account, error = %err, "Could not list manager locks");
                None
            }
        }
    }

    pub fn remove_lock(&mut self, address: &str) {
        let store = self.store.remove(address);
        self.commit(store);
    }

    /// Replace the lock being edited with another one.
    pub async fn change_lock(&mut self, address: &str, network: u64, name: Option<&str>) -> Result<()> {
        checksum_address(address)?;
        self.remove_lock(address);
        self.add_lock(address, network, name, None).await
    }

    pub fn reorder(&mut self, address: &str, change: i64) -> Result<()> {
        let store = self.store.reorder(address, change)?;
        self.commit(store);
        Ok(())
    }

    /// Set the number of renewals; `None` restores the one-year default for the lock.
    pub async fn set_recurring(
        &mut self,
        address: &str,
        recurring_payments: Option<RecurringPayments>,
    ) -> Result<()> {
        let network = self
            .store
            .get(address)
            .ok_or_else(|| LockStoreError::UnknownLock(address.to_string()))?
            .network
            .ok_or_else(|| CheckoutError::MissingNetwork(address.to_string()))?;
        let recurring_payments = match recurring_payments {
            Some(value) => Some(value),
            None => self.default_recurring(network, address).await,
        };
        let store = self.store.set_recurring(address, recurring_payments)?;
        self.commit(store);
        Ok(())
    }

    async fn default_recurring(&self, network: u64, address: &str) -> Option<RecurringPayments> {
        let eligibility = match self.recurring.get(network, address).await {
            Ok(eligibility) => eligibility,
            Err(err) => {
                tracing::warn!(network, lock = address, error = %err, "Recurring eligibility unavailable");
                return None;
            }
        };
        if !eligibility.is_recurring_possible {
            return None;
        }
        eligibility.one_year_recurring.map(RecurringPayments::Count)
    }

    pub fn add_metadata(&mut self, address: &str, field: MetadataInput) -> Result<()> {
        let store = self.store.add_metadata(address, field)?;
        self.commit(store);
        Ok(())
    }

    pub fn remove_metadata(&mut self, address: &str, field_name: &str) -> Result<()> {
        let store = self.store.remove_metadata(address, field_name)?;
        self.commit(store);
        Ok(())
    }

    pub fn edit_metadata(&mut self, address: &str, index: usize, field: MetadataInput) -> Result<()> {
        let store = self.store.edit_metadata(address, index, field)?;
        self.commit(store);
        Ok(())
    }

    /// Resolve recurring eligibility for every configured lock.
    pub async fn preload_recurring(&self) -> HashMap<String, RecurringEligibility> {
        let mut tasks = JoinSet::new();
        for (address, lock) in self.store.locks() {
            let Some(network) = lock.network else {
                continue;
            };
            let cache = Arc::clone(&self.recurring);
            let address = address.clone();
            tasks.spawn(async move {
                let res = cache.get(network, &address).await;
                (address, res)
            });
        }

        let mut out = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((address, Ok(eligibility))) => {
                    out.insert(address, eligibility);
                }
                Ok((address, Err(err))) => {
                    tracing::warn!(lock = %address, error = %err, "Recurring eligibility unavailable");
                }
                Err(err) => tracing::warn!(error = %err, "Recurring lookup task failed"),
            }
        }
        out
    }
}
