//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use log::*;

use flux_common_types::{optional::Optional, BlockId, PublicKey};
use flux_storage::{
    deserialize_json,
    serialize_json,
    KeyValueStore,
    KvReadTransaction,
    KvWriteTransaction,
    Map,
    StorageError,
};

use crate::{error::BlockAppendError, models::Block, ChainError};

const LOG_TARGET: &str = "flux::chain::history_store";

const MAP_BLOCKS: Map = Map("blocks");
const MAP_SIGNATURES: Map = Map("signatures");
const MAP_SIGNATURES_REVERSE: Map = Map("signatures_reverse");
const MAP_SCORE: Map = Map("score");

fn height_key(height: u64) -> [u8; 8] {
    height.to_be_bytes()
}

/// Append-only log of finalized blocks, indexed by height and by block id,
/// with a running cumulative chain score. Every mutation touches all four
/// maps in one transaction, so their cardinalities stay identical.
#[derive(Debug, Clone)]
pub struct HistoryStore<TStore> {
    store: TStore,
}

impl<TStore: KeyValueStore> HistoryStore<TStore> {
    /// Opens the store, refusing if the four indices disagree on how many
    /// blocks there are (a partial write from a crashed process would do
    /// that, and nothing here can repair it).
    pub fn open(store: TStore) -> Result<Self, ChainError> {
        let (blocks, signatures, reverse, score) = store.with_read_tx(|tx| {
            Ok::<_, ChainError>((
                tx.count(MAP_BLOCKS)?,
                tx.count(MAP_SIGNATURES)?,
                tx.count(MAP_SIGNATURES_REVERSE)?,
                tx.count(MAP_SCORE)?,
            ))
        })?;
        if blocks != signatures || blocks != reverse || blocks != score {
            return Err(ChainError::StoreInconsistent {
                details: format!(
                    "index cardinality mismatch: blocks={}, signatures={}, signatures_reverse={}, score={}",
                    blocks, signatures, reverse, score
                ),
            });
        }
        info!(target: LOG_TARGET, "History store opened at height {}", blocks);
        Ok(Self { store })
    }

    /// Appends `block` as the new last block. Fails with `ParentMismatch`
    /// unless the store is empty or `block.reference` is the current last
    /// block id. Returns the new height.
    pub fn append(&self, block: &Block) -> Result<u64, ChainError> {
        self.store.with_write_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            let mut cumulative_score = u128::from(block.block_score());
            if height > 0 {
                let last_id = id_at(tx, height)?;
                if last_id != block.reference() {
                    return Err(BlockAppendError::ParentMismatch {
                        reference: block.reference(),
                        expected: last_id,
                    }
                    .into());
                }
                cumulative_score += score_at(tx, height)?;
            }

            let new_height = height + 1;
            tx.put(MAP_BLOCKS, height_key(new_height).to_vec(), serialize_json("block", block)?)?;
            tx.put(MAP_SIGNATURES, height_key(new_height).to_vec(), block.unique_id().to_vec())?;
            tx.put(
                MAP_SIGNATURES_REVERSE,
                block.unique_id().to_vec(),
                height_key(new_height).to_vec(),
            )?;
            tx.put(MAP_SCORE, height_key(new_height).to_vec(), cumulative_score.to_be_bytes().to_vec())?;
            debug!(
                target: LOG_TARGET,
                "Appended block {} at height {} (score {})", block.unique_id(), new_height, cumulative_score
            );
            Ok(new_height)
        })
    }

    /// Removes the block at the current height. Returns it, or `None` if the
    /// store is empty.
    pub fn discard_last(&self) -> Result<Option<Block>, ChainError> {
        self.store.with_write_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            if height == 0 {
                return Ok(None);
            }
            let id = id_at(tx, height)?;
            let block = block_at_height(tx, height)?;
            tx.delete(MAP_BLOCKS, &height_key(height))?;
            tx.delete(MAP_SIGNATURES, &height_key(height))?;
            tx.delete(MAP_SIGNATURES_REVERSE, id.as_bytes())?;
            tx.delete(MAP_SCORE, &height_key(height))?;
            warn!(target: LOG_TARGET, "Discarded block {} at height {}", id, height);
            Ok(Some(block))
        })
    }

    pub fn height(&self) -> Result<u64, ChainError> {
        self.store.with_read_tx(|tx| Ok(tx.count(MAP_SIGNATURES)?))
    }

    pub fn block_at(&self, height: u64) -> Result<Option<Block>, ChainError> {
        self.store.with_read_tx(|tx| block_at_height(tx, height).optional())
    }

    /// The stored serialized form of the block at `height`.
    pub fn block_bytes(&self, height: u64) -> Result<Option<Vec<u8>>, ChainError> {
        self.store.with_read_tx(|tx| Ok(tx.get(MAP_BLOCKS, &height_key(height))?))
    }

    pub fn height_of(&self, id: BlockId) -> Result<Option<u64>, ChainError> {
        self.store.with_read_tx(|tx| height_of_id(tx, id))
    }

    /// Cumulative chain score up to and including the block `id`.
    pub fn score_of(&self, id: BlockId) -> Result<Option<u128>, ChainError> {
        self.store.with_read_tx(|tx| {
            let Some(height) = height_of_id(tx, id)? else {
                return Ok(None);
            };
            Ok(Some(score_at(tx, height)?))
        })
    }

    /// Cumulative chain score at the tip, zero for an empty store.
    pub fn score(&self) -> Result<u128, ChainError> {
        self.store.with_read_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            if height == 0 {
                return Ok(0);
            }
            score_at(tx, height)
        })
    }

    pub fn last_block(&self) -> Result<Option<Block>, ChainError> {
        self.store.with_read_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            if height == 0 {
                return Ok(None);
            }
            Ok(Some(block_at_height(tx, height)?))
        })
    }

    pub fn last_block_id(&self) -> Result<Option<BlockId>, ChainError> {
        self.store.with_read_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            if height == 0 {
                return Ok(None);
            }
            Ok(Some(id_at(tx, height)?))
        })
    }

    /// The ids of the last `n` blocks, newest first.
    pub fn last_block_ids(&self, n: usize) -> Result<Vec<BlockId>, ChainError> {
        self.store.with_read_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            let mut ids = Vec::with_capacity(n.min(height as usize));
            let mut h = height;
            while h > 0 && ids.len() < n {
                ids.push(id_at(tx, h)?);
                h -= 1;
            }
            Ok(ids)
        })
    }

    /// Blocks generated by `account` in the height range `[from, to]`
    /// (clamped to the stored range), ascending by height.
    pub fn generated_by(&self, account: PublicKey, from: u64, to: u64) -> Result<Vec<Block>, ChainError> {
        self.store.with_read_tx(|tx| {
            let height = tx.count(MAP_SIGNATURES)?;
            let mut blocks = Vec::new();
            for h in from.max(1)..=to.min(height) {
                let block = block_at_height(tx, h)?;
                if block.generator() == account {
                    blocks.push(block);
                }
            }
            Ok(blocks)
        })
    }
}

fn block_at_height<T: KvReadTransaction>(tx: &T, height: u64) -> Result<Block, ChainError> {
    let bytes = tx
        .get(MAP_BLOCKS, &height_key(height))?
        .ok_or_else(|| StorageError::not_found("block", &height_key(height)))?;
    Ok(deserialize_json("block", &bytes)?)
}

fn id_at<T: KvReadTransaction>(tx: &T, height: u64) -> Result<BlockId, ChainError> {
    let bytes = tx
        .get(MAP_SIGNATURES, &height_key(height))?
        .ok_or_else(|| StorageError::not_found("block id", &height_key(height)))?;
    BlockId::try_from(bytes.as_slice()).map_err(|e| {
        ChainError::from(StorageError::DecodeError {
            item: "block id",
            details: e.to_string(),
        })
    })
}

fn height_of_id<T: KvReadTransaction>(tx: &T, id: BlockId) -> Result<Option<u64>, ChainError> {
    let Some(bytes) = tx.get(MAP_SIGNATURES_REVERSE, id.as_bytes())? else {
        return Ok(None);
    };
    let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
        ChainError::from(StorageError::DecodeError {
            item: "block height",
            details: format!("expected 8 bytes, got {}", bytes.len()),
        })
    })?;
    Ok(Some(u64::from_be_bytes(raw)))
}

fn score_at<T: KvReadTransaction>(tx: &T, height: u64) -> Result<u128, ChainError> {
    let bytes = tx
        .get(MAP_SCORE, &height_key(height))?
        .ok_or_else(|| StorageError::not_found("chain score", &height_key(height)))?;
    let raw: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
        ChainError::from(StorageError::DecodeError {
            item: "chain score",
            details: format!("expected 16 bytes, got {}", bytes.len()),
        })
    })?;
    Ok(u128::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use flux_common_types::TxId;
    use flux_storage::MemoryKvStore;

    use super::*;
    use crate::models::{SignerData, Transaction};

    fn id(n: u8) -> BlockId {
        BlockId::from([n; 32])
    }

    fn block(reference: BlockId, signature: BlockId, score: u64) -> Block {
        Block::new(
            3,
            reference,
            SignerData {
                generator: PublicKey::from([1u8; 32]),
                signature,
            },
            1000,
            score,
            vec![Transaction::new(TxId::from([signature.as_bytes()[0]; 32]), vec![])],
        )
    }

    fn open_store() -> HistoryStore<MemoryKvStore> {
        HistoryStore::open(MemoryKvStore::new()).unwrap()
    }

    #[test]
    fn it_appends_and_indexes_blocks() {
        let store = open_store();
        store.append(&block(id(0), id(1), 10)).unwrap();
        store.append(&block(id(1), id(2), 15)).unwrap();

        assert_eq!(store.height().unwrap(), 2);
        assert_eq!(store.height_of(id(2)).unwrap(), Some(2));
        assert_eq!(store.score_of(id(1)).unwrap(), Some(10));
        assert_eq!(store.score_of(id(2)).unwrap(), Some(25));
        assert_eq!(store.last_block_id().unwrap(), Some(id(2)));
        assert_eq!(store.last_block_ids(5).unwrap(), vec![id(2), id(1)]);
        assert_eq!(store.block_at(1).unwrap().unwrap().unique_id(), id(1));
        assert!(store.block_bytes(2).unwrap().is_some());
    }

    #[test]
    fn it_rejects_a_mismatched_parent() {
        let store = open_store();
        store.append(&block(id(0), id(1), 10)).unwrap();
        let err = store.append(&block(id(9), id(2), 10)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::BlockAppend(BlockAppendError::ParentMismatch { .. })
        ));
        assert_eq!(store.height().unwrap(), 1);
    }

    #[test]
    fn it_discards_the_last_block() {
        let store = open_store();
        store.append(&block(id(0), id(1), 10)).unwrap();
        store.append(&block(id(1), id(2), 15)).unwrap();

        let removed = store.discard_last().unwrap().unwrap();
        assert_eq!(removed.unique_id(), id(2));
        assert_eq!(store.height().unwrap(), 1);
        assert_eq!(store.height_of(id(2)).unwrap(), None);
        assert_eq!(store.last_block_id().unwrap(), Some(id(1)));

        store.discard_last().unwrap().unwrap();
        assert!(store.discard_last().unwrap().is_none());
    }

    #[test]
    fn it_finds_blocks_generated_by_an_account() {
        let store = open_store();
        store.append(&block(id(0), id(1), 10)).unwrap();
        store.append(&block(id(1), id(2), 10)).unwrap();
        let generated = store.generated_by(PublicKey::from([1u8; 32]), 1, 10).unwrap();
        assert_eq!(generated.len(), 2);
        let none = store.generated_by(PublicKey::from([2u8; 32]), 1, 10).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn it_refuses_to_open_an_inconsistent_store() {
        let kv = MemoryKvStore::new();
        {
            let store = HistoryStore::open(kv.clone()).unwrap();
            store.append(&block(id(0), id(1), 10)).unwrap();
        }
        // Simulate a torn write by dropping one index entry
        let mut tx = kv.create_write_tx().unwrap();
        tx.delete(MAP_SCORE, &height_key(1)).unwrap();
        tx.commit().unwrap();

        let err = HistoryStore::open(kv).unwrap_err();
        assert!(matches!(err, ChainError::StoreInconsistent { .. }));
    }
}
