pub mod address;
pub mod locks;
pub mod models;
pub mod paywall;
pub mod recurring;
pub mod vat;

pub use address::{checksum_address, same_address, AddressError};
pub use locks::{LockConfigStore, LockStoreError, Locks};
