//! Injected key-value persistence and the account workflow built on it.
//!
//! The store is an explicit dependency with an explicit lifecycle: built once
//! at process start, handed to `AccountStore::open` which runs the idempotent
//! admin bootstrap, torn down with the process.

pub mod accounts;
pub mod kv;

pub use accounts::{AccountStore, LoginOutcome, StoreError, UserAccount, ADMIN_USERNAME};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
