//! Checkout (paywall) configuration document and its JSON file export.

use crate::locks::{LockConfigStore, Locks};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PAYWALL_CONFIG_FILE: &str = "paywall-config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaywallConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub locks: Locks,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PaywallConfig {
    pub fn store(&self) -> LockConfigStore {
        LockConfigStore::from_defaults(self.locks.clone())
    }

    /// Replace the locks, written in rank order so that reloading keeps the ranking.
    pub fn with_store(mut self, store: LockConfigStore) -> Self {
        self.locks = store
            .sorted()
            .into_iter()
            .map(|(address, lock)| (address.to_string(), lock.clone()))
            .collect();
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize paywall config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read paywall config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid paywall config {}", path.display()))
    }

    /// Write the config as `paywall-config.json` inside `dir`.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(PAYWALL_CONFIG_FILE);
        self.save(&path)?;
        Ok(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write paywall config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LockConfig;
    use serde_json::json;

    #[test]
    fn export_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LockConfigStore::new().add(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            5,
            LockConfig {
                name: Some("Pass".into()),
                ..Default::default()
            },
        );
        let config = PaywallConfig {
            title: Some("Members".into()),
            ..Default::default()
        }
        .with_store(store);

        let path = config.export(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), PAYWALL_CONFIG_FILE);
        let loaded = PaywallConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn reordered_locks_survive_reload() {
        let a = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let b = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
        let store = LockConfigStore::new()
            .add(a, 1, LockConfig::default())
            .add(b, 1, LockConfig::default())
            .reorder(b, -1)
            .unwrap();
        let config = PaywallConfig::default().with_store(store);

        let reloaded: PaywallConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        let ranked: Vec<_> = reloaded.store().sorted().into_iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(ranked, vec![b.to_string(), a.to_string()]);
    }

    #[test]
    fn saved_file_with_case_variant_keys_loads_one_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PAYWALL_CONFIG_FILE);
        fs::write(
            &path,
            r#"{"locks": {
                "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed": {"name": "Pass", "network": 1},
                "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed": {"network": 5}
            }}"#,
        )
        .unwrap();

        let store = PaywallConfig::load(&path).unwrap().store();
        assert_eq!(store.len(), 1);
        let lock = store.get("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap();
        assert_eq!(lock.name.as_deref(), Some("Pass"));
        assert_eq!(lock.network, Some(5));
        assert_eq!(
            store.remove("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").len(),
            0
        );
    }

    #[test]
    fn keeps_unknown_top_level_settings() {
        let config: PaywallConfig = serde_json::from_value(json!({
            "locks": {},
            "pessimistic": true,
            "referrer": "0x01"
        }))
        .unwrap();
        assert_eq!(config.extra.get("pessimistic"), Some(&json!(true)));
        let out: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(out["referrer"], json!("0x01"));
    }
}
