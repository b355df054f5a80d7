//! Durable storage for multi-session loads

pub mod storage;

pub use storage::{PersistentStorage, StorageError, StorageResult};
