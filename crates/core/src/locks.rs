//! Ordered, address-keyed collection of lock checkout configurations.
//!
//! Every operation returns a new store; the receiver is never mutated.

use crate::address::same_address;
use crate::models::{LockConfig, MetadataInput, RecurringPayments};
use indexmap::IndexMap;
use thiserror::Error;

pub type Locks = IndexMap<String, LockConfig>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockStoreError {
    #[error("lock {0} is not configured")]
    UnknownLock(String),
    #[error("locks can only move by one position, got {0}")]
    InvalidReorder(i64),
    #[error("metadata field index {index} out of range ({len} fields)")]
    MetadataIndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockConfigStore {
    locks: Locks,
}

impl LockConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load saved locks, ranking them in the order given.
    ///
    /// Keys naming the same address in a different case are merged into the first one.
    pub fn from_defaults(defaults: Locks) -> Self {
        let mut merged = Locks::new();
        for (address, lock) in defaults {
            let existing = merged.keys().find(|k| same_address(k, &address)).cloned();
            match existing {
                Some(key) => {
                    if let Some(first) = merged.get_mut(&key) {
                        *first = std::mem::take(first).merged_with(lock);
                    }
                }
                None => {
                    merged.insert(address, lock);
                }
            }
        }
        let locks = merged
            .into_iter()
            .enumerate()
            .map(|(order, (address, lock))| (address, LockConfig { order, ..lock }))
            .collect();
        Self { locks }
    }

    pub fn locks(&self) -> &Locks {
        &self.locks
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Stored key for `address`, preserving its original case.
    pub fn key_of(&self, address: &str) -> Option<&str> {
        self.locks
            .keys()
            .find(|k| same_address(k, address))
            .map(String::as_str)
    }

    pub fn get(&self, address: &str) -> Option<&LockConfig> {
        self.key_of(address).and_then(|k| self.locks.get(k))
    }

    /// Entries by ascending `order`.
    pub fn sorted(&self) -> Vec<(&str, &LockConfig)> {
        let mut entries: Vec<_> = self
            .locks
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        entries.sort_by_key(|(_, lock)| lock.order);
        entries
    }

    /// Insert a lock or merge `fields` into the existing entry for `address`.
    pub fn add(&self, address: &str, network: u64, fields: LockConfig) -> Self {
        let mut locks = self.locks.clone();
        match self.key_of(address).map(str::to_string) {
            Some(key) => {
                let existing = locks.get(&key).cloned().unwrap_or_default();
                let merged = existing.merged_with(LockConfig {
                    network: fields.network.or(Some(network)),
                    ..fields
                });
                locks.insert(key, merged);
            }
            None => {
                let lock = LockConfig {
                    network: Some(network),
                    order: locks.len(),
                    ..LockConfig::default()
                }
                .merged_with(fields);
                locks.insert(address.to_string(), lock);
            }
        }
        Self { locks }
    }

    /// Drop `address` and re-rank the remaining locks densely, keeping their relative order.
    pub fn remove(&self, address: &str) -> Self {
        let mut remaining: Vec<(String, LockConfig)> = self
            .locks
            .iter()
            .filter(|(k, _)| !same_address(k, address))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        remaining.sort_by_key(|(_, lock)| lock.order);
        let locks = remaining
            .into_iter()
            .enumerate()
            .map(|(order, (address, lock))| (address, LockConfig { order, ..lock }))
            .collect();
        Self { locks }
    }

    /// Swap `address` with its neighbour one rank up (`-1`) or down (`+1`).
    ///
    /// Moving past either end, or moving an unknown lock, leaves the store unchanged.
    pub fn reorder(&self, address: &str, change: i64) -> Result<Self, LockStoreError> {
        if change != -1 && change != 1 {
            return Err(LockStoreError::InvalidReorder(change));
        }
        let Some(key) = self.key_of(address) else {
            return Ok(self.clone());
        };
        let order = self.locks[key].order;
        let Some(target) = order.checked_add_signed(change as isize) else {
            return Ok(self.clone());
        };
        let Some(neighbour) = self
            .locks
            .iter()
            .find(|(_, lock)| lock.order == target)
            .map(|(k, _)| k.clone())
        else {
            return Ok(self.clone());
        };

        let key = key.to_string();
        let mut locks = self.locks.clone();
        if let Some(lock) = locks.get_mut(&neighbour) {
            lock.order = order;
        }
        if let Some(lock) = locks.get_mut(&key) {
            lock.order = target;
        }
        Ok(Self { locks })
    }

    /// Replace the renewal setting of `address`; `None` clears it.
    pub fn set_recurring(
        &self,
        address: &str,
        recurring_payments: Option<RecurringPayments>,
    ) -> Result<Self, LockStoreError> {
        let key = self
            .key_of(address)
            .ok_or_else(|| LockStoreError::UnknownLock(address.to_string()))?
            .to_string();
        let mut locks = self.locks.clone();
        if let Some(lock) = locks.get_mut(&key) {
            lock.recurring_payments = recurring_payments;
        }
        Ok(Self { locks })
    }

    pub fn add_metadata(&self, address: &str, field: MetadataInput) -> Result<Self, LockStoreError> {
        self.update_metadata(address, |inputs| {
            inputs.push(field);
            Ok(())
        })
    }

    /// Remove every metadata field whose name matches `field_name`, ignoring case.
    pub fn remove_metadata(&self, address: &str, field_name: &str) -> Result<Self, LockStoreError> {
        let needle = field_name.to_lowercase();
        self.update_metadata(address, |inputs| {
            inputs.retain(|input| input.name.to_lowercase() != needle);
            Ok(())
        })
    }

    pub fn edit_metadata(
        &self,
        address: &str,
        index: usize,
        field: MetadataInput,
    ) -> Result<Self, LockStoreError> {
        self.update_metadata(address, |inputs| {
            let len = inputs.len();
            let slot = inputs
                .get_mut(index)
                .ok_or(LockStoreError::MetadataIndexOutOfRange { index, len })?;
            *slot = field;
            Ok(())
        })
    }

    fn update_metadata<F>(&self, address: &str, f: F) -> Result<Self, LockStoreError>
    where
        F: FnOnce(&mut Vec<MetadataInput>) -> Result<(), LockStoreError>,
    {
        let key = self
            .key_of(address)
            .ok_or_else(|| LockStoreError::UnknownLock(address.to_string()))?
            .to_string();
        let mut locks = self.locks.clone();
        let lock = locks
            .get_mut(&key)
            .ok_or_else(|| LockStoreError::UnknownLock(address.to_string()))?;
        let mut inputs = lock.metadata_inputs.take().unwrap_or_default();
        f(&mut inputs)?;
        lock.metadata_inputs = Some(inputs);
        Ok(Self { locks })
    }
}
