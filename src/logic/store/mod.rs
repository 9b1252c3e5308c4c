//! Durable Object Store
//!
//! Simple keyed-collection contract consumed by the alert lifecycle manager
//! (and usable for canonical activity sets). Implementations enforce a hard
//! capacity ceiling and surface over-capacity writes instead of truncating.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Store failure conditions. Distinguishable by the caller; the core never
/// retries writes - that belongs to the storage collaborator.
#[derive(Debug)]
pub enum StoreError {
    /// Write rejected: items exceed the capacity ceiling
    CapacityExceeded { attempted: usize, capacity: usize },
    /// Backend failure (I/O, corruption, serialization)
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::CapacityExceeded {
                attempted,
                capacity,
            } => write!(
                f,
                "store capacity exceeded: {} items, capacity {}",
                attempted, capacity
            ),
            StoreError::Backend(detail) => write!(f, "store backend error: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

/// Keyed object store: whole-collection reads and writes plus a reset.
pub trait ObjectStore<T>: Send + Sync {
    fn get_all(&self) -> Result<Vec<T>, StoreError>;
    fn put_all(&self, items: &[T]) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}
