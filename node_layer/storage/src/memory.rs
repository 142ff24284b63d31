//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{KeyValueStore, KvReadTransaction, KvWriteTransaction, Map, StorageError};

type MapData = HashMap<Map, BTreeMap<Vec<u8>, Vec<u8>>>;
type Overlay = HashMap<Map, BTreeMap<Vec<u8>, Option<Vec<u8>>>>;

/// In-memory store backed by ordered maps. The write transaction holds the
/// write side of the lock for its whole lifetime, so writers are serialized
/// and readers always observe a committed snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    state: Arc<RwLock<MapData>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    type ReadTransaction<'a> = MemoryReadTransaction<'a> where Self: 'a;
    type WriteTransaction<'a> = MemoryWriteTransaction<'a> where Self: 'a;

    fn create_read_tx(&self) -> Result<Self::ReadTransaction<'_>, StorageError> {
        let guard = self.state.read().map_err(|_| StorageError::LockPoisoned {
            operation: "creating a read transaction",
        })?;
        Ok(MemoryReadTransaction { guard })
    }

    fn create_write_tx(&self) -> Result<Self::WriteTransaction<'_>, StorageError> {
        let guard = self.state.write().map_err(|_| StorageError::LockPoisoned {
            operation: "creating a write transaction",
        })?;
        Ok(MemoryWriteTransaction {
            pending: Overlay::default(),
            guard,
        })
    }
}

pub struct MemoryReadTransaction<'a> {
    guard: RwLockReadGuard<'a, MapData>,
}

impl KvReadTransaction for MemoryReadTransaction<'_> {
    fn get(&self, map: Map, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.guard.get(&map).and_then(|m| m.get(key).cloned()))
    }

    fn count(&self, map: Map) -> Result<u64, StorageError> {
        Ok(self.guard.get(&map).map(|m| m.len() as u64).unwrap_or(0))
    }

    fn scan_prefix(&self, map: Map, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let Some(m) = self.guard.get(&map) else {
            return Ok(Vec::new());
        };
        Ok(m.range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

pub struct MemoryWriteTransaction<'a> {
    /// Buffered writes, applied to the underlying maps on commit. `None`
    /// marks a deletion.
    pending: Overlay,
    guard: RwLockWriteGuard<'a, MapData>,
}

impl KvReadTransaction for MemoryWriteTransaction<'_> {
    fn get(&self, map: Map, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(entry) = self.pending.get(&map).and_then(|m| m.get(key)) {
            return Ok(entry.clone());
        }
        Ok(self.guard.get(&map).and_then(|m| m.get(key).cloned()))
    }

    fn count(&self, map: Map) -> Result<u64, StorageError> {
        let committed = self.guard.get(&map);
        let mut count = committed.map(|m| m.len() as u64).unwrap_or(0);
        if let Some(pending) = self.pending.get(&map) {
            for (key, entry) in pending {
                let exists = committed.map(|m| m.contains_key(key)).unwrap_or(false);
                match (exists, entry) {
                    (false, Some(_)) => count += 1,
                    (true, None) => count -= 1,
                    _ => {},
                }
            }
        }
        Ok(count)
    }

    fn scan_prefix(&self, map: Map, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut merged = self
            .guard
            .get(&map)
            .map(|m| {
                m.range(prefix.to_vec()..)
                    .take_while(|(k, _)| k.starts_with(prefix))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();
        if let Some(pending) = self.pending.get(&map) {
            let overlay = pending
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix));
            for (key, entry) in overlay {
                match entry {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    },
                    None => {
                        merged.remove(key);
                    },
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl KvWriteTransaction for MemoryWriteTransaction<'_> {
    fn put(&mut self, map: Map, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.pending.entry(map).or_default().insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, map: Map, key: &[u8]) -> Result<(), StorageError> {
        self.pending.entry(map).or_default().insert(key.to_vec(), None);
        Ok(())
    }

    fn commit(mut self) -> Result<(), StorageError> {
        for (map, entries) in self.pending.drain() {
            let target = self.guard.entry(map).or_default();
            for (key, entry) in entries {
                match entry {
                    Some(value) => {
                        target.insert(key, value);
                    },
                    None => {
                        target.remove(&key);
                    },
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: Map = Map("orders");

    #[test]
    fn it_reads_own_writes() {
        let store = MemoryKvStore::new();
        let mut tx = store.create_write_tx().unwrap();
        tx.put(ORDERS, b"abc".to_vec(), vec![1, 2, 3]).unwrap();
        assert_eq!(tx.get(ORDERS, b"abc").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(tx.get(ORDERS, b"def").unwrap(), None);
    }

    #[test]
    fn it_rolls_back_on_drop_and_commits_explicitly() {
        let store = MemoryKvStore::new();
        {
            let mut tx = store.create_write_tx().unwrap();
            tx.put(ORDERS, b"abc".to_vec(), vec![1]).unwrap();
            // Drop without commit rolls back
        }
        {
            let tx = store.create_read_tx().unwrap();
            assert_eq!(tx.get(ORDERS, b"abc").unwrap(), None);
        }

        {
            let mut tx = store.create_write_tx().unwrap();
            tx.put(ORDERS, b"abc".to_vec(), vec![1]).unwrap();
            tx.commit().unwrap();
        }
        let tx = store.create_read_tx().unwrap();
        assert_eq!(tx.get(ORDERS, b"abc").unwrap(), Some(vec![1]));
    }

    #[test]
    fn it_scans_prefixes_in_key_order() {
        let store = MemoryKvStore::new();
        let mut tx = store.create_write_tx().unwrap();
        tx.put(ORDERS, b"a/2".to_vec(), vec![2]).unwrap();
        tx.put(ORDERS, b"a/1".to_vec(), vec![1]).unwrap();
        tx.put(ORDERS, b"b/1".to_vec(), vec![3]).unwrap();
        let entries = tx.scan_prefix(ORDERS, b"a/").unwrap();
        assert_eq!(entries, vec![(b"a/1".to_vec(), vec![1]), (b"a/2".to_vec(), vec![2])]);
        tx.commit().unwrap();

        let tx = store.create_read_tx().unwrap();
        let entries = tx.scan_prefix(ORDERS, b"a/").unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn it_applies_pending_deletes_to_reads_counts_and_scans() {
        let store = MemoryKvStore::new();
        let mut tx = store.create_write_tx().unwrap();
        tx.put(ORDERS, b"a/1".to_vec(), vec![1]).unwrap();
        tx.put(ORDERS, b"a/2".to_vec(), vec![2]).unwrap();
        tx.commit().unwrap();

        let mut tx = store.create_write_tx().unwrap();
        tx.delete(ORDERS, b"a/1").unwrap();
        assert_eq!(tx.get(ORDERS, b"a/1").unwrap(), None);
        assert_eq!(tx.count(ORDERS).unwrap(), 1);
        assert_eq!(tx.scan_prefix(ORDERS, b"a/").unwrap().len(), 1);
        tx.commit().unwrap();

        let tx = store.create_read_tx().unwrap();
        assert_eq!(tx.count(ORDERS).unwrap(), 1);
    }
}
