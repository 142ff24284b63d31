//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};

use log::*;

use flux_common_types::BlockId;
use flux_storage::{KeyValueStore, StorageError};

use crate::{
    error::{BlockAppendError, MicroBlockAppendError},
    models::{Block, MicroBlock, Transaction},
    BlockVerifier,
    ChainError,
    ChainHooks,
    HistoryStore,
    LiquidHead,
    NoopChainHooks,
    ValidationError,
};

const LOG_TARGET: &str = "flux::chain::writer";

struct NgChainInner<TStore, THooks> {
    history: HistoryStore<TStore>,
    liquid: LiquidHead,
    hooks: THooks,
}

/// Presents the persisted history and the liquid head as one chain and makes
/// block appends atomic. A single reader-writer lock protects both parts:
/// the liquid head never diverges from the history under a concurrent
/// reader. Consensus rules are supplied per call as a validator callback
/// whose diff result is opaque to this layer.
pub struct NgChain<TStore, THooks = NoopChainHooks> {
    inner: RwLock<NgChainInner<TStore, THooks>>,
    verifier: Arc<dyn BlockVerifier>,
}

impl<TStore, THooks> NgChain<TStore, THooks>
where
    TStore: KeyValueStore,
    THooks: ChainHooks,
{
    pub fn new(store: TStore, verifier: Arc<dyn BlockVerifier>, hooks: THooks) -> Result<Self, ChainError> {
        let history = HistoryStore::open(store)?;
        Ok(Self {
            inner: RwLock::new(NgChainInner {
                history,
                liquid: LiquidHead::new(),
                hooks,
            }),
            verifier,
        })
    }

    /// Appends a block on top of the chain.
    ///
    /// With an empty liquid head the block must reference the last persisted
    /// block (or the history must be empty); on success it becomes the new
    /// base. With a liquid head present, the block's reference selects a
    /// microblock prefix to forge: the forged block is persisted, the suffix
    /// is discarded and its transactions are returned so the caller can
    /// requeue them, and the new block becomes the base.
    ///
    /// The validator receives the timestamp of the block being extended
    /// (`None` at genesis) and runs before any state is touched, so a
    /// consensus reject leaves the chain unchanged.
    pub fn append_block<TDiff, TValidator>(
        &self,
        block: Block,
        validator: TValidator,
    ) -> Result<(TDiff, Vec<Transaction>), ChainError>
    where
        TValidator: FnOnce(Option<i64>) -> Result<TDiff, ValidationError>,
    {
        let mut guard = self.write_inner()?;
        let NgChainInner { history, liquid, hooks } = &mut *guard;

        if liquid.is_empty() {
            let last = history.last_block()?;
            if let Some(last) = &last {
                if last.unique_id() != block.reference() {
                    return Err(BlockAppendError::ParentMismatch {
                        reference: block.reference(),
                        expected: last.unique_id(),
                    }
                    .into());
                }
            }
            let diff = validator(last.map(|b| b.timestamp()))?;
            info!(target: LOG_TARGET, "New liquid base {}", block);
            liquid.set_base(block);
            return Ok((diff, Vec::new()));
        }

        let timer = Instant::now();
        let (forged, discarded) =
            liquid
                .forge_prefix_ending_at(block.reference())
                .ok_or(BlockAppendError::LiquidReferenceUnknown {
                    reference: block.reference(),
                })?;
        hooks.on_forge_block_time(timer.elapsed());

        if !self.verifier.check_block(&forged) {
            error!(
                target: LOG_TARGET,
                "Forged block {} failed the signature self-check. The liquid head is corrupt.",
                forged.unique_id()
            );
            return Err(BlockAppendError::InvalidForgedSignature { id: forged.unique_id() }.into());
        }

        let diff = validator(Some(forged.timestamp()))?;
        history.append(&forged)?;

        if !discarded.is_empty() {
            warn!(
                target: LOG_TARGET,
                "Microblock fork: forging {} discarded {} microblocks",
                forged.unique_id(),
                discarded.len()
            );
            hooks.on_micro_fork(discarded.len());
        }
        let discarded_txs = discarded
            .iter()
            .rev()
            .flat_map(|m| m.transactions().iter().cloned())
            .collect();

        info!(target: LOG_TARGET, "Forged {} and started new liquid base {}", forged.unique_id(), block.unique_id());
        liquid.set_base(block);
        Ok((diff, discarded_txs))
    }

    /// Appends a microblock to the liquid head. The validator receives the
    /// base block timestamp. Fork rejections are counted through the hooks.
    pub fn append_micro_block<TDiff, TValidator>(
        &self,
        micro: MicroBlock,
        validator: TValidator,
    ) -> Result<TDiff, ChainError>
    where
        TValidator: FnOnce(i64) -> Result<TDiff, ValidationError>,
    {
        let mut guard = self.write_inner()?;
        let NgChainInner { liquid, hooks, .. } = &mut *guard;
        let res = liquid.append_micro(micro, &*self.verifier, validator);
        if let Err(ChainError::MicroBlockAppend(err)) = &res {
            warn!(target: LOG_TARGET, "Rejecting microblock: {}", err);
            match err {
                MicroBlockAppendError::BlockMicroFork { .. } => hooks.on_block_micro_fork(),
                MicroBlockAppendError::MicroMicroFork { .. } => hooks.on_micro_micro_fork(),
                _ => {},
            }
        }
        res
    }

    /// Drops the liquid block, returning its base transactions; with no
    /// liquid block, removes the last persisted block instead.
    pub fn discard_block(&self) -> Result<Vec<Transaction>, ChainError> {
        let mut guard = self.write_inner()?;
        if let Some(base) = guard.liquid.clear() {
            info!(target: LOG_TARGET, "Discarded liquid block {}", base.unique_id());
            return Ok(base.into_transactions());
        }
        guard.history.discard_last()?;
        Ok(Vec::new())
    }

    /// Persisted height plus one if a liquid block is present.
    pub fn height(&self) -> Result<u64, ChainError> {
        let guard = self.read_inner()?;
        let liquid = u64::from(!guard.liquid.is_empty());
        Ok(guard.history.height()? + liquid)
    }

    /// Total chain score including the liquid block.
    pub fn score(&self) -> Result<u128, ChainError> {
        let guard = self.read_inner()?;
        let liquid = guard.liquid.base().map(|b| u128::from(b.block_score())).unwrap_or(0);
        Ok(guard.history.score()? + liquid)
    }

    /// Cumulative score up to `id`, which may be the liquid base id or any
    /// microblock total signature.
    pub fn score_of(&self, id: BlockId) -> Result<Option<u128>, ChainError> {
        let guard = self.read_inner()?;
        if let Some(score) = guard.history.score_of(id)? {
            return Ok(Some(score));
        }
        match guard.liquid.base() {
            Some(base) if guard.liquid.contains(id) => {
                Ok(Some(guard.history.score()? + u128::from(base.block_score())))
            },
            _ => Ok(None),
        }
    }

    pub fn height_of(&self, id: BlockId) -> Result<Option<u64>, ChainError> {
        let guard = self.read_inner()?;
        if let Some(height) = guard.history.height_of(id)? {
            return Ok(Some(height));
        }
        if guard.liquid.contains(id) {
            return Ok(Some(guard.history.height()? + 1));
        }
        Ok(None)
    }

    /// Ids of the last `n` blocks, newest first, starting from the liquid
    /// tip when present.
    pub fn last_block_ids(&self, n: usize) -> Result<Vec<BlockId>, ChainError> {
        let guard = self.read_inner()?;
        match guard.liquid.best_liquid_id() {
            Some(tip) if n > 0 => {
                let mut ids = vec![tip];
                ids.extend(guard.history.last_block_ids(n - 1)?);
                Ok(ids)
            },
            _ => guard.history.last_block_ids(n),
        }
    }

    pub fn last_block_id(&self) -> Result<Option<BlockId>, ChainError> {
        let guard = self.read_inner()?;
        match guard.liquid.best_liquid_id() {
            Some(tip) => Ok(Some(tip)),
            None => guard.history.last_block_id(),
        }
    }

    /// The best liquid block, or the last persisted block when the head is
    /// empty. Materialized as a value.
    pub fn last_block(&self) -> Result<Option<Block>, ChainError> {
        let guard = self.read_inner()?;
        match guard.liquid.best_liquid_block() {
            Some(block) => Ok(Some(block)),
            None => guard.history.last_block(),
        }
    }

    pub fn best_liquid_block(&self) -> Result<Option<Block>, ChainError> {
        Ok(self.read_inner()?.liquid.best_liquid_block())
    }

    /// Looks up a microblock of the liquid chain by its total signature.
    pub fn micro_block(&self, total_res_block_sig: BlockId) -> Result<Option<MicroBlock>, ChainError> {
        Ok(self.read_inner()?.liquid.micro_block(total_res_block_sig).cloned())
    }

    pub fn contains(&self, id: BlockId) -> Result<bool, ChainError> {
        let guard = self.read_inner()?;
        Ok(guard.liquid.contains(id) || guard.history.height_of(id)?.is_some())
    }

    pub fn block_at(&self, height: u64) -> Result<Option<Block>, ChainError> {
        self.read_inner()?.history.block_at(height)
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, NgChainInner<TStore, THooks>>, ChainError> {
        self.inner.read().map_err(|_| {
            ChainError::from(StorageError::LockPoisoned {
                operation: "reading the chain state",
            })
        })
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, NgChainInner<TStore, THooks>>, ChainError> {
        self.inner.write().map_err(|_| {
            ChainError::from(StorageError::LockPoisoned {
                operation: "writing the chain state",
            })
        })
    }
}
