//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use crate::StorageError;

/// A named ordered map within a store. Components declare their maps as
/// constants and key them with hand-encoded big-endian byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Map(pub &'static str);

impl Display for Map {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait KvReadTransaction {
    fn get(&self, map: Map, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    fn exists(&self, map: Map, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(map, key)?.is_some())
    }

    fn count(&self, map: Map) -> Result<u64, StorageError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    /// An empty prefix scans the whole map.
    fn scan_prefix(&self, map: Map, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;
}

pub trait KvWriteTransaction: KvReadTransaction {
    fn put(&mut self, map: Map, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError>;

    fn delete(&mut self, map: Map, key: &[u8]) -> Result<(), StorageError>;

    /// Makes all buffered writes durable. Dropping the transaction without
    /// committing rolls them back.
    fn commit(self) -> Result<(), StorageError>;
}

/// A store of named ordered maps with transactional access. One write
/// transaction is open at a time; readers observe only committed state.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    type ReadTransaction<'a>: KvReadTransaction
    where Self: 'a;
    type WriteTransaction<'a>: KvWriteTransaction
    where Self: 'a;

    fn create_read_tx(&self) -> Result<Self::ReadTransaction<'_>, StorageError>;

    fn create_write_tx(&self) -> Result<Self::WriteTransaction<'_>, StorageError>;

    fn with_read_tx<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&Self::ReadTransaction<'_>) -> Result<R, E>,
        E: From<StorageError>,
    {
        let tx = self.create_read_tx()?;
        f(&tx)
    }

    /// Runs `f` inside a write transaction, committing on `Ok` and rolling
    /// back on `Err`.
    fn with_write_tx<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self::WriteTransaction<'_>) -> Result<R, E>,
        E: From<StorageError>,
    {
        let mut tx = self.create_write_tx()?;
        let ret = f(&mut tx)?;
        tx.commit()?;
        Ok(ret)
    }
}
