//! In-memory stand-ins for the remote services, used when the app runs with `kind = "mock"`
//! and by the service tests.

use super::{IndexerApi, LockReader, LocksmithApi, LocksmithError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use unlock_dash_core::models::{Job, LockSummary, Purchaser, ReceiptResponse, SupplierProfile};
use unlock_dash_core::recurring::LockDetails;

fn lock_key(network: u64, lock: &str) -> (u64, String) {
    (network, lock.to_lowercase())
}

#[derive(Default)]
pub struct MockLocksmith {
    receipts: RwLock<HashMap<(u64, String, String), ReceiptResponse>>,
    bases: RwLock<HashMap<(u64, String), SupplierProfile>>,
    jobs: RwLock<HashMap<(u64, String), Job>>,
    stall_status: AtomicBool,
    requests: AtomicUsize,
}

impl MockLocksmith {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert_receipt(&self, network: u64, lock: &str, hash: &str, receipt: ReceiptResponse) {
        let (network, lock) = lock_key(network, lock);
        self.receipts
            .write()
            .await
            .insert((network, lock, hash.to_lowercase()), receipt);
    }

    pub async fn insert_receipts_base(&self, network: u64, lock: &str, supplier: SupplierProfile) {
        self.bases.write().await.insert(lock_key(network, lock), supplier);
    }

    pub async fn insert_job(&self, network: u64, lock: &str, job: Job) {
        self.jobs.write().await.insert(lock_key(network, lock), job);
    }

    /// Make status requests hang until this is reset.
    pub fn stall_status(&self, stall: bool) {
        self.stall_status.store(stall, Ordering::SeqCst);
    }

    /// Number of API calls served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocksmithApi for MockLocksmith {
    async fn get_receipt(&self, network: u64, lock: &str, hash: &str) -> Result<ReceiptResponse> {
        self.record();
        let (network, lock) = lock_key(network, lock);
        self.receipts
            .read()
            .await
            .get(&(network, lock, hash.to_lowercase()))
            .cloned()
            .ok_or_else(|| LocksmithError::NotFound(hash.to_string()))
    }

    async fn save_receipt(
        &self,
        network: u64,
        lock: &str,
        hash: &str,
        purchaser: &Purchaser,
    ) -> Result<ReceiptResponse> {
        self.record();
        let (network, lock) = lock_key(network, lock);
        let mut receipts = self.receipts.write().await;
        let receipt = receipts
            .get_mut(&(network, lock, hash.to_lowercase()))
            .ok_or_else(|| LocksmithError::NotFound(hash.to_string()))?;
        receipt.purchaser = Some(purchaser.clone());
        Ok(receipt.clone())
    }

    async fn get_receipts_base(&self, network: u64, lock: &str) -> Result<SupplierProfile> {
        self.record();
        Ok(self
            .bases
            .read()
            .await
            .get(&lock_key(network, lock))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_receipts_base(
        &self,
        network: u64,
        lock: &str,
        supplier: &SupplierProfile,
    ) -> Result<SupplierProfile> {
        self.record();
        let stored = SupplierProfile {
            vat_rate_percentage: None,
            ..supplier.clone()
        };
        self.bases
            .write()
            .await
            .insert(lock_key(network, lock), stored.clone());
        Ok(stored)
    }

    async fn get_receipts_status(&self, network: u64, lock: &str) -> Result<Option<Job>> {
        self.record();
        while self.stall_status.load(Ordering::SeqCst) {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
        Ok(self.jobs.read().await.get(&lock_key(network, lock)).cloned())
    }
}

#[derive(Default)]
pub struct MockIndexer {
    key_hashes: RwLock<HashMap<(u64, String), Vec<String>>>,
    managed: RwLock<HashMap<(u64, String), Vec<LockSummary>>>,
}

impl MockIndexer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert_key(&self, network: u64, lock: &str, token_id: &str, hashes: Vec<String>) {
        let id = format!("{}-{}", lock.to_lowercase(), token_id);
        self.key_hashes.write().await.insert((network, id), hashes);
    }

    pub async fn insert_managed_lock(&self, network: u64, manager: &str, lock: LockSummary) {
        self.managed
            .write()
            .await
            .entry(lock_key(network, manager))
            .or_default()
            .push(lock);
    }
}

#[async_trait]
impl IndexerApi for MockIndexer {
    async fn key_transaction_hashes(
        &self,
        network: u64,
        lock: &str,
        token_id: &str,
    ) -> Result<Vec<String>> {
        let id = format!("{}-{}", lock.to_lowercase(), token_id);
        Ok(self
            .key_hashes
            .read()
            .await
            .get(&(network, id))
            .cloned()
            .unwrap_or_default())
    }

    async fn locks_by_manager(&self, network: u64, manager: &str) -> Result<Vec<LockSummary>> {
        Ok(self
            .managed
            .read()
            .await
            .get(&lock_key(network, manager))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockLockReader {
    locks: RwLock<HashMap<(u64, String), LockDetails>>,
    managers: RwLock<HashMap<(u64, String), Vec<String>>>,
    reads: AtomicUsize,
}

impl MockLockReader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert_lock(&self, details: LockDetails) {
        let key = lock_key(details.network, &details.address);
        self.locks.write().await.insert(key, details);
    }

    pub async fn insert_manager(&self, network: u64, lock: &str, account: &str) {
        self.managers
            .write()
            .await
            .entry(lock_key(network, lock))
            .or_default()
            .push(account.to_lowercase());
    }

    /// Number of `lock_details` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LockReader for MockLockReader {
    async fn lock_details(&self, network: u64, lock: &str) -> Result<LockDetails> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        // yield so concurrent callers overlap
        tokio::task::yield_now().await;
        self.locks
            .read()
            .await
            .get(&lock_key(network, lock))
            .cloned()
            .ok_or_else(|| LocksmithError::NotFound(lock.to_string()))
    }

    async fn is_lock_manager(&self, network: u64, lock: &str, account: &str) -> Result<bool> {
        Ok(self
            .managers
            .read()
            .await
            .get(&lock_key(network, lock))
            .map(|accounts| accounts.iter().any(|a| a == &account.to_lowercase()))
            .unwrap_or(false))
    }
}
