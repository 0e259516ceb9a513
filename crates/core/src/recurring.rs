//! Whether a lock supports automatic renewals, and how many renewals make up a year.

use crate::address::is_zero_address;
use serde::{Deserialize, Serialize};

pub const ONE_YEAR_SECS: u64 = 365 * 24 * 60 * 60;
pub const MIN_RECURRING_LOCK_VERSION: u16 = 10;

/// Read-only view of the on-chain lock parameters that drive recurring payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockDetails {
    pub address: String,
    pub network: u64,
    /// `None` when keys never expire.
    pub expiration_duration: Option<u64>,
    /// `None` for locks priced in the native currency.
    pub currency_contract_address: Option<String>,
    pub key_price: u128,
    pub public_lock_version: u16,
}

impl LockDetails {
    pub fn is_erc20(&self) -> bool {
        self.currency_contract_address
            .as_deref()
            .map(|a| !is_zero_address(a))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringEligibility {
    pub is_recurring_possible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_year_recurring: Option<u64>,
}

impl RecurringEligibility {
    pub fn for_lock(lock: &LockDetails) -> Self {
        let duration = match lock.expiration_duration {
            Some(d) if d > 0 => d,
            _ => return Self::default(),
        };
        let is_recurring_possible = lock.public_lock_version >= MIN_RECURRING_LOCK_VERSION
            && lock.is_erc20()
            && lock.key_price > 0;
        if !is_recurring_possible {
            return Self::default();
        }
        Self {
            is_recurring_possible,
            one_year_recurring: Some(ONE_YEAR_SECS / duration),
        }
    }
}
