mod status;
mod url;

pub use status::{PollingConfig, StatusSnapshot, StatusWatch, StopReason};
pub use url::receipts_url;

use locksmith::{IndexerApi, LockReader, LocksmithApi, LocksmithError};
use std::sync::Arc;
use tokio::task::JoinSet;
use unlock_dash_core::models::{Purchaser, ReceiptResponse, SupplierProfile};
use unlock_dash_core::{checksum_address, AddressError};

#[derive(Debug, thiserror::Error)]
pub enum ReceiptsError {
    #[error("not authorized to update receipts base for lock {0}")]
    NotAuthorized(String),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Remote(#[from] LocksmithError),
    #[error("invalid app origin: {0}")]
    InvalidOrigin(String),
}

pub type Result<T, E = ReceiptsError> = std::result::Result<T, E>;

/// Read and write access to receipts and supplier profiles.
#[derive(Clone)]
pub struct ReceiptService {
    locksmith: Arc<dyn LocksmithApi + 'static>,
    indexer: Arc<dyn IndexerApi + 'static>,
    lock_reader: Arc<dyn LockReader + 'static>,
    polling: PollingConfig,
}

impl ReceiptService {
    pub fn new(
        locksmith: Arc<dyn LocksmithApi + 'static>,
        indexer: Arc<dyn IndexerApi + 'static>,
        lock_reader: Arc<dyn LockReader + 'static>,
    ) -> Self {
        Self {
            locksmith,
            indexer,
            lock_reader,
            polling: PollingConfig::default(),
        }
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Fetch a single receipt. Any failure, including an unknown hash, yields an empty response.
    pub async fn get_receipt(&self, network: u64, lock: &str, hash: &str) -> ReceiptResponse {
        let lock = match checksum_address(lock) {
            Ok(address) => address,
            Err(err) => {
                tracing::warn!(network, lock, error = %err, "Invalid lock address for receipt");
                return ReceiptResponse::default();
            }
        };
        match self.locksmith.get_receipt(network, &lock, hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!(network, lock = %lock, hash, error = %err, "Receipt unavailable");
                ReceiptResponse::default()
            }
        }
    }

    /// All receipts recorded for a key, in the order the indexer lists their transactions.
    ///
    /// Receipts that fail to load or come back empty are left out.
    pub async fn get_receipts_for_key(
        &self,
        network: u64,
        lock: &str,
        token_id: &str,
    ) -> Result<Vec<ReceiptResponse>> {
        let lock = checksum_address(lock)?;
        let hashes = self
            .indexer
            .key_transaction_hashes(network, &lock, token_id)
            .await?;

        let mut tasks = JoinSet::new();
        for (index, hash) in hashes.into_iter().enumerate() {
            let api = Arc::clone(&self.locksmith);
            let lock = lock.clone();
            tasks.spawn(async move {
                let res = api.get_receipt(network, &lock, &hash).await;
                (index, hash, res)
            });
        }

        let mut found = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(receipt))) if !receipt.is_empty() => found.push((index, receipt)),
                Ok((_, hash, Ok(_))) => {
                    tracing::debug!(network, lock = %lock, hash = %hash, "Dropping empty receipt");
                }
                Ok((_, hash, Err(err))) => {
                    tracing::debug!(network, lock = %lock, hash = %hash, error = %err, "Dropping failed receipt");
                }
                Err(err) => tracing::warn!(error = %err, "Receipt fetch task failed"),
            }
        }
        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, receipt)| receipt).collect())
    }

    /// Supplier profile with `vat_rate_percentage` derived. Only managers may read it.
    pub async fn get_receipts_base(
        &self,
        network: u64,
        lock: &str,
        is_manager: bool,
    ) -> Result<Option<SupplierProfile>> {
        if !is_manager {
            return Ok(None);
        }
        let supplier = self.locksmith.get_receipts_base(network, lock).await?;
        Ok(Some(supplier.with_vat_percentage()))
    }

    /// Save the purchaser details of a receipt. Failures yield an empty response.
    pub async fn update_receipt(
        &self,
        network: u64,
        lock: &str,
        hash: &str,
        purchaser: &Purchaser,
    ) -> ReceiptResponse {
        let lock = match checksum_address(lock) {
            Ok(address) => address,
            Err(err) => {
                tracing::warn!(network, lock, error = %err, "Invalid lock address for receipt update");
                return ReceiptResponse::default();
            }
        };
        match self
            .locksmith
            .save_receipt(network, &lock, hash, purchaser)
            .await
        {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!(network, lock = %lock, hash, error = %err, "Receipt update failed");
                ReceiptResponse::default()
            }
        }
    }

    /// Save the supplier profile, converting the edited VAT percentage to basis points.
    pub async fn update_receipts_base(
        &self,
        network: u64,
        lock: &str,
        is_manager: bool,
        supplier: &SupplierProfile,
    ) -> Result<SupplierProfile> {
        if !is_manager {
            return Err(ReceiptsError::NotAuthorized(lock.to_string()));
        }
        let payload = supplier.clone().with_vat_basis_points();
        let saved = self
            .locksmith
            .save_receipts_base(network, lock, &payload)
            .await?;
        Ok(saved.with_vat_percentage())
    }

    pub async fn is_lock_manager(&self, network: u64, lock: &str, account: &str) -> Result<bool> {
        Ok(self
            .lock_reader
            .is_lock_manager(network, lock, account)
            .await?)
    }

    /// Start polling the receipts export job for `lock`. Polling stops when the returned
    /// watch is dropped.
    pub fn watch_receipts_status(&self, network: u64, lock: &str, condition: bool) -> StatusWatch {
        StatusWatch::spawn(
            Arc::clone(&self.locksmith),
            network,
            lock.to_string(),
            condition,
            self.polling,
        )
    }
}
