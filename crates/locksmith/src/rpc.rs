//! Lock contract reads over JSON-RPC `eth_call`.

use super::{http::read_json, LockReader, LocksmithError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use unlock_dash_core::address::{function_selector, is_zero_address};
use unlock_dash_core::checksum_address;
use unlock_dash_core::recurring::LockDetails;

type Word = [u8; 32];

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct RpcLockReader {
    providers: HashMap<u64, String>,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcLockReader {
    pub fn new(providers: HashMap<u64, String>) -> Arc<Self> {
        Arc::new(Self {
            providers,
            http_client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, network: u64, to: &str, data: Vec<u8>) -> Result<Word> {
        let provider = self
            .providers
            .get(&network)
            .ok_or(LocksmithError::UnknownNetwork(network))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"],
        });

        let resp = self.http_client.post(provider).json(&body).send().await?;
        let rpc: RpcResponse = read_json(resp, provider).await?;
        if let Some(err) = rpc.error {
            return Err(LocksmithError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let result = rpc
            .result
            .ok_or_else(|| LocksmithError::Decode("eth_call returned no result".to_string()))?;
        decode_word(&result)
    }

    async fn call_view(&self, network: u64, lock: &str, signature: &str) -> Result<Word> {
        self.call(network, lock, function_selector(signature).to_vec())
            .await
    }
}

fn decode_word(raw: &str) -> Result<Word> {
    let body = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(body).map_err(|e| LocksmithError::Decode(format!("{raw}: {e}")))?;
    if bytes.len() < 32 {
        return Err(LocksmithError::Decode(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes[..32]);
    Ok(word)
}

/// `None` when the value does not fit in 64 bits; unlimited durations are encoded as `uint256.max`.
fn word_to_u64(word: &Word) -> Option<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Some(u64::from_be_bytes(buf))
}

fn word_to_u128_saturating(word: &Word) -> u128 {
    if word[..16].iter().any(|b| *b != 0) {
        return u128::MAX;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    u128::from_be_bytes(buf)
}

fn word_to_address(word: &Word) -> String {
    format!("0x{}", hex::encode(&word[12..]))
}

fn encode_address(address: &str) -> Result<Word> {
    let checksummed = checksum_address(address)?;
    let raw = hex::decode(&checksummed[2..]).map_err(|e| LocksmithError::Decode(e.to_string()))?;
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&raw);
    Ok(word)
}

#[async_trait]
impl LockReader for RpcLockReader {
    async fn lock_details(&self, network: u64, lock: &str) -> Result<LockDetails> {
        let address = checksum_address(lock)?;
        let expiration = self.call_view(network, &address, "expirationDuration()").await?;
        let token = self.call_view(network, &address, "tokenAddress()").await?;
        let price = self.call_view(network, &address, "keyPrice()").await?;
        let version = self.call_view(network, &address, "publicLockVersion()").await?;

        let currency = word_to_address(&token);
        let details = LockDetails {
            address,
            network,
            expiration_duration: word_to_u64(&expiration),
            currency_contract_address: (!is_zero_address(&currency)).then_some(currency),
            key_price: word_to_u128_saturating(&price),
            public_lock_version: word_to_u64(&version)
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| LocksmithError::Decode("publicLockVersion out of range".into()))?,
        };
        tracing::debug!(network, lock = %details.address, version = details.public_lock_version, "Read lock details");
        Ok(details)
    }

    async fn is_lock_manager(&self, network: u64, lock: &str, account: &str) -> Result<bool> {
        let address = checksum_address(lock)?;
        let mut data = function_selector("isLockManager(address)").to_vec();
        data.extend_from_slice(&encode_address(account)?);
        let word = self.call(network, &address, data).await?;
        Ok(word[31] == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_uint_words() {
        let word = decode_word(&format!("0x{:064x}", 2_592_000u64)).unwrap();
        assert_eq!(word_to_u64(&word), Some(2_592_000));
        let max = decode_word(&format!("0x{}", "f".repeat(64))).unwrap();
        assert_eq!(word_to_u64(&max), None);
        assert_eq!(word_to_u128_saturating(&max), u128::MAX);
    }

    #[test]
    fn decodes_and_encodes_addresses() {
        let address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let word = encode_address(address).unwrap();
        assert_eq!(word_to_address(&word), address.to_lowercase());
        assert!(word[..12].iter().all(|b| *b == 0));
    }

    #[test]
    fn rejects_short_results() {
        assert!(matches!(decode_word("0x"), Err(LocksmithError::Decode(_))));
        assert!(matches!(decode_word("0xzz"), Err(LocksmithError::Decode(_))));
    }
}
