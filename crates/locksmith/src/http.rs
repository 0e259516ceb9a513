use super::{LocksmithApi, LocksmithError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use unlock_dash_core::checksum_address;
use unlock_dash_core::models::{Job, Purchaser, ReceiptResponse, SupplierProfile};

#[derive(Clone)]
pub struct LocksmithClient {
    pub base_url: String,
    http_client: reqwest::Client,
    access_token: Option<String>,
}

/// Write requests carry their payload under `data`.
#[derive(Serialize)]
struct SaveBody<'a, T> {
    data: &'a T,
}

impl LocksmithClient {
    /// `host` is the locksmith origin, e.g. `https://locksmith.unlock-protocol.com`.
    pub fn new(host: &str, access_token: Option<String>) -> Arc<Self> {
        Self::with_http_client(host, access_token, reqwest::Client::new())
    }

    pub fn with_http_client(
        host: &str,
        access_token: Option<String>,
        http_client: reqwest::Client,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url: format!("{}/v2", host.trim_end_matches('/')),
            http_client,
            access_token,
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.access_token.as_deref() {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    fn receipt_url(&self, network: u64, lock: &str, hash: &str) -> Result<String> {
        Ok(format!(
            "{}/receipts/{}/{}/{}",
            self.base_url,
            network,
            checksum_address(lock)?,
            hash
        ))
    }

    fn receipts_base_url(&self, network: u64, lock: &str) -> Result<String> {
        Ok(format!(
            "{}/receipts-base/{}/{}",
            self.base_url,
            network,
            checksum_address(lock)?
        ))
    }

    fn receipts_status_url(&self, network: u64, lock: &str) -> Result<String> {
        Ok(format!(
            "{}/receipts/all/{}/{}/status",
            self.base_url,
            network,
            checksum_address(lock)?
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let req = self.authorized(self.http_client.get(url));
        let resp = req.send().await?;
        read_json(resp, url).await
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = SaveBody { data: body };
        let req = self.authorized(self.http_client.post(url).json(&body));
        let resp = req.send().await?;
        read_json(resp, url).await
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(LocksmithError::NotFound(url.to_string()));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = resp.text().await.unwrap_or_default();
        return Err(LocksmithError::Unauthorized(body));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(LocksmithError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| LocksmithError::Decode(format!("{url}: {e}")))
}

#[async_trait]
impl LocksmithApi for LocksmithClient {
    async fn get_receipt(&self, network: u64, lock: &str, hash: &str) -> Result<ReceiptResponse> {
        let url = self.receipt_url(network, lock, hash)?;
        let receipt: ReceiptResponse = self.get_json(&url).await?;
        tracing::debug!(network, lock, hash, "Fetched receipt from locksmith");
        Ok(receipt)
    }

    async fn save_receipt(
        &self,
        network: u64,
        lock: &str,
        hash: &str,
        purchaser: &Purchaser,
    ) -> Result<ReceiptResponse> {
        let url = self.receipt_url(network, lock, hash)?;
        let saved: ReceiptResponse = self.post_json(&url, purchaser).await?;
        tracing::info!(network, lock, hash, "Receipt purchaser saved to locksmith");
        Ok(saved)
    }

    async fn get_receipts_base(&self, network: u64, lock: &str) -> Result<SupplierProfile> {
        let url = self.receipts_base_url(network, lock)?;
        self.get_json(&url).await
    }

    async fn save_receipts_base(
        &self,
        network: u64,
        lock: &str,
        supplier: &SupplierProfile,
    ) -> Result<SupplierProfile> {
        let url = self.receipts_base_url(network, lock)?;
        let saved: SupplierProfile = self.post_json(&url, supplier).await?;
        tracing::info!(network, lock, "Receipts base saved to locksmith");
        Ok(saved)
    }

    async fn get_receipts_status(&self, network: u64, lock: &str) -> Result<Option<Job>> {
        let url = self.receipts_status_url(network, lock)?;
        match self.get_json::<Job>(&url).await {
            Ok(job) => Ok(Some(job)),
            Err(LocksmithError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
