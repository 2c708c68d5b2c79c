#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryKvStore, KvStore, ProgressError, ProgressLookup, ProgressRecord, ProgressStore,
    StorageError,
};
pub use sqlite::{SqliteInitError, SqliteStore};
