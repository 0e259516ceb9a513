use async_trait::async_trait;
use unlock_dash_core::models::{Job, LockSummary, Purchaser, ReceiptResponse, SupplierProfile};
use unlock_dash_core::recurring::LockDetails;
use unlock_dash_core::AddressError;

pub use reqwest::Url;

#[derive(Debug, thiserror::Error)]
pub enum LocksmithError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("no endpoint configured for network {0}")]
    UnknownNetwork(u64),
    #[error("graphql error: {0}")]
    Graphql(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error(transparent)]
    Address(#[from] AddressError),
}

pub type Result<T, E = LocksmithError> = std::result::Result<T, E>;

/// Receipts and supplier profiles held by the locksmith REST backend.
#[async_trait]
pub trait LocksmithApi: Send + Sync {
    async fn get_receipt(&self, network: u64, lock: &str, hash: &str) -> Result<ReceiptResponse>;
    async fn save_receipt(
        &self,
        network: u64,
        lock: &str,
        hash: &str,
        purchaser: &Purchaser,
    ) -> Result<ReceiptResponse>;
    async fn get_receipts_base(&self, network: u64, lock: &str) -> Result<SupplierProfile>;
    async fn save_receipts_base(
        &self,
        network: u64,
        lock: &str,
        supplier: &SupplierProfile,
    ) -> Result<SupplierProfile>;
    /// Latest receipts export job for the lock, if one was ever started.
    async fn get_receipts_status(&self, network: u64, lock: &str) -> Result<Option<Job>>;
}

/// Subgraph-style indexer queries.
#[async_trait]
pub trait IndexerApi: Send + Sync {
    async fn key_transaction_hashes(
        &self,
        network: u64,
        lock: &str,
        token_id: &str,
    ) -> Result<Vec<String>>;
    async fn locks_by_manager(&self, network: u64, manager: &str) -> Result<Vec<LockSummary>>;
}

/// Read-only access to lock contracts.
#[async_trait]
pub trait LockReader: Send + Sync {
    async fn lock_details(&self, network: u64, lock: &str) -> Result<LockDetails>;
    async fn is_lock_manager(&self, network: u64, lock: &str, account: &str) -> Result<bool>;
}

pub mod http;
pub mod mock;
pub mod rpc;
pub mod subgraph;
