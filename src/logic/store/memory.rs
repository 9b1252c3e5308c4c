//! In-Memory Store
//!
//! Default store for a single analysis session.

use parking_lot::Mutex;

use super::{ObjectStore, StoreError};

pub struct MemoryStore<T> {
    items: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T> MemoryStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            capacity,
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl<T: Clone + Send + Sync> ObjectStore<T> for MemoryStore<T> {
    fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.items.lock().clone())
    }

    fn put_all(&self, items: &[T]) -> Result<(), StoreError> {
        if items.len() > self.capacity {
            return Err(StoreError::CapacityExceeded {
                attempted: items.len(),
                capacity: self.capacity,
            });
        }
        *self.items.lock() = items.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.items.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_clear() {
        let store = MemoryStore::new(10);
        store.put_all(&[1, 2, 3]).unwrap();
        assert_eq!(store.get_all().unwrap(), vec![1, 2, 3]);
        store.clear().unwrap();
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_capacity_ceiling() {
        let store = MemoryStore::new(2);
        let err = store.put_all(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::CapacityExceeded {
                attempted: 3,
                capacity: 2
            }
        ));
        // Rejected write leaves the store untouched
        assert!(store.get_all().unwrap().is_empty());
    }
}
