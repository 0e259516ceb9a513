use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

const APP_NAME: &str = "unlock-dashboard";
const KEYCHAIN_SERVICE: &str = "com.unlock-protocol.dashboard";

pub const LOCKSMITH_TOKEN_KEY: &str = "locksmith_access_token";
pub const LOCKSMITH_TOKEN_ENV: &str = "UNLOCK_LOCKSMITH_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connected account, used for manager checks and lock names.
    pub account: Option<String>,
    #[serde(default = "default_app_origin")]
    pub app_origin: String,
    #[serde(default)]
    pub locksmith: LocksmithConfig,
    #[serde(default)]
    pub polling: PollingSettings,
    /// Keyed by chain id.
    #[serde(default = "default_networks")]
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            account: None,
            app_origin: default_app_origin(),
            locksmith: LocksmithConfig::default(),
            polling: PollingSettings::default(),
            networks: default_networks(),
        }
    }
}

impl AppConfig {
    pub fn network(&self, id: u64) -> Option<&NetworkConfig> {
        self.networks.get(&id.to_string())
    }

    /// JSON-RPC provider per chain id. Entries with a non-numeric key are skipped.
    pub fn providers(&self) -> HashMap<u64, String> {
        self.by_chain_id(|n| Some(n.provider.clone()))
    }

    pub fn subgraphs(&self) -> HashMap<u64, String> {
        self.by_chain_id(|n| n.subgraph.clone())
    }

    fn by_chain_id<F>(&self, f: F) -> HashMap<u64, String>
    where
        F: Fn(&NetworkConfig) -> Option<String>,
    {
        self.networks
            .iter()
            .filter_map(|(id, network)| match id.parse::<u64>() {
                Ok(id) => f(network).map(|value| (id, value)),
                Err(_) => {
                    tracing::warn!(network = %id, "Ignoring network with non-numeric chain id");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocksmithConfig {
    #[serde(default = "default_locksmith_kind")]
    pub kind: String, // "http" | "mock"
    #[serde(default = "default_locksmith_host")]
    pub host: String,
}

impl Default for LocksmithConfig {
    fn default() -> Self {
        Self {
            kind: default_locksmith_kind(),
            host: default_locksmith_host(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub provider: String,
    pub subgraph: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_locksmith_kind() -> String {
    "http".to_string()
}

fn default_locksmith_host() -> String {
    "https://locksmith.unlock-protocol.com".to_string()
}

fn default_app_origin() -> String {
    "https://app.unlock-protocol.com".to_string()
}

fn default_interval_secs() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    5 * 60
}

fn default_networks() -> BTreeMap<String, NetworkConfig> {
    let studio = "https://subgraph.unlock-protocol.com";
    [
        ("1", "Ethereum", "https://rpc.unlock-protocol.com/1", "mainnet-v2"),
        ("10", "Optimism", "https://rpc.unlock-protocol.com/10", "optimism-v2"),
        ("137", "Polygon", "https://rpc.unlock-protocol.com/137", "polygon-v2"),
        ("8453", "Base", "https://rpc.unlock-protocol.com/8453", "base-v2"),
    ]
    .into_iter()
    .map(|(id, name, provider, subgraph)| {
        (
            id.to_string(),
            NetworkConfig {
                name: name.to_string(),
                provider: provider.to_string(),
                subgraph: Some(format!("{studio}/{subgraph}")),
            },
        )
    })
    .collect()
}

pub fn load() -> Result<AppConfig> {
    let cfg: AppConfig = confy::load(APP_NAME, None).context("Failed to load app config")?;
    Ok(cfg)
}

pub fn store(cfg: &AppConfig) -> Result<()> {
    confy::store(APP_NAME, None, cfg).context("Failed to store app config")?;
    Ok(())
}

/// Load from an explicit file instead of the per-user location.
pub fn load_path(path: &Path) -> Result<AppConfig> {
    let cfg: AppConfig = confy::load_path(path)
        .with_context(|| format!("Failed to load app config from {}", path.display()))?;
    Ok(cfg)
}

pub fn store_path(path: &Path, cfg: &AppConfig) -> Result<()> {
    confy::store_path(path, cfg)
        .with_context(|| format!("Failed to store app config to {}", path.display()))?;
    Ok(())
}

/// Store a secret in the OS keychain
pub fn store_secret(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Delete a secret from the OS keychain
pub fn delete_secret(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.delete_password()?;
    Ok(())
}

/// Locksmith access token from the environment, then the keychain.
pub fn locksmith_token() -> Option<String> {
    std::env::var(LOCKSMITH_TOKEN_ENV)
        .ok()
        .filter(|token| !token.is_empty())
        .or_else(|| get_secret(LOCKSMITH_TOKEN_KEY).ok())
}
