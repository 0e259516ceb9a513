use super::{http::read_json, IndexerApi, LocksmithError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use unlock_dash_core::models::LockSummary;

const KEY_QUERY: &str = r#"query Key($where: Key_filter) {
  keys(where: $where, first: 1) {
    id
    tokenId
    transactionsHash
  }
}"#;

const LOCKS_BY_MANAGER_QUERY: &str = r#"query LocksByManager($manager: Bytes!) {
  locks(where: { lockManagers_contains: [$manager] }, first: 1000) {
    address
    name
  }
}"#;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct KeysData {
    #[serde(default)]
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyEntry {
    #[serde(default)]
    transactions_hash: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LocksData {
    #[serde(default)]
    locks: Vec<LockSummary>,
}

/// Client for the per-network subgraph endpoints.
#[derive(Clone)]
pub struct SubgraphClient {
    endpoints: HashMap<u64, String>,
    http_client: reqwest::Client,
}

impl SubgraphClient {
    pub fn new(endpoints: HashMap<u64, String>) -> Arc<Self> {
        Arc::new(Self {
            endpoints,
            http_client: reqwest::Client::new(),
        })
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        network: u64,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let endpoint = self
            .endpoints
            .get(&network)
            .ok_or(LocksmithError::UnknownNetwork(network))?;

        let resp = self
            .http_client
            .post(endpoint)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await?;
        let body: GraphqlResponse<T> = read_json(resp, endpoint).await?;

        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(LocksmithError::Graphql(messages.join("; ")));
        }
        body.data
            .ok_or_else(|| LocksmithError::Decode("graphql response without data".to_string()))
    }
}

#[async_trait]
impl IndexerApi for SubgraphClient {
    async fn key_transaction_hashes(
        &self,
        network: u64,
        lock: &str,
        token_id: &str,
    ) -> Result<Vec<String>> {
        // Subgraph entity ids use the lowercase lock address.
        let id = format!("{}-{}", lock.to_lowercase(), token_id);
        let data: KeysData = self
            .query(
                network,
                KEY_QUERY,
                json!({ "where": { "id": id, "tokenId": token_id } }),
            )
            .await?;
        let hashes = data
            .keys
            .into_iter()
            .next()
            .map(|k| k.transactions_hash)
            .unwrap_or_default();
        tracing::debug!(network, lock, token_id, count = hashes.len(), "Resolved key transactions");
        Ok(hashes)
    }

    async fn locks_by_manager(&self, network: u64, manager: &str) -> Result<Vec<LockSummary>> {
        let data: LocksData = self
            .query(
                network,
                LOCKS_BY_MANAGER_QUERY,
                json!({ "manager": manager.to_lowercase() }),
            )
            .await?;
        Ok(data.locks)
    }
}
