//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::collections::VecDeque;

use log::*;

use flux_common_types::BlockId;

use crate::{
    error::MicroBlockAppendError,
    models::{Block, MicroBlock, Transaction},
    BlockVerifier,
    ChainError,
    ValidationError,
};

const LOG_TARGET: &str = "flux::chain::liquid_head";

#[derive(Debug, Clone)]
struct LiquidState {
    base: Block,
    /// Newest first, so the tip is `micros.front()`.
    micros: VecDeque<MicroBlock>,
}

/// The mutable tip of the chain: at most one base block plus the chain of
/// microblocks extending it. Not internally synchronized; [`crate::NgChain`]
/// keeps it consistent with the persisted history under one lock.
#[derive(Debug, Clone, Default)]
pub struct LiquidHead {
    state: Option<LiquidState>,
}

impl LiquidHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }

    pub fn base(&self) -> Option<&Block> {
        self.state.as_ref().map(|s| &s.base)
    }

    pub fn micro_count(&self) -> usize {
        self.state.as_ref().map(|s| s.micros.len()).unwrap_or(0)
    }

    /// Replaces any prior state with a fresh base block and no microblocks.
    pub fn set_base(&mut self, block: Block) {
        self.state = Some(LiquidState {
            base: block,
            micros: VecDeque::new(),
        });
    }

    /// Empties the head, returning the previous base block if there was one.
    pub fn clear(&mut self) -> Option<Block> {
        self.state.take().map(|s| s.base)
    }

    /// Id of the best liquid block: the newest total signature, or the base
    /// id when no microblocks have arrived yet.
    pub fn best_liquid_id(&self) -> Option<BlockId> {
        let state = self.state.as_ref()?;
        Some(
            state
                .micros
                .front()
                .map(|m| m.total_res_block_sig())
                .unwrap_or_else(|| state.base.unique_id()),
        )
    }

    /// Whether `id` is the base id or any microblock total signature.
    pub fn contains(&self, id: BlockId) -> bool {
        let Some(state) = self.state.as_ref() else {
            return false;
        };
        state.base.unique_id() == id || state.micros.iter().any(|m| m.total_res_block_sig() == id)
    }

    pub fn micro_block(&self, total_res_block_sig: BlockId) -> Option<&MicroBlock> {
        self.state
            .as_ref()?
            .micros
            .iter()
            .find(|m| m.total_res_block_sig() == total_res_block_sig)
    }

    /// Validates chaining, checks the microblock signature through
    /// `verifier`, runs the consensus `validator` and only then appends the
    /// microblock as the new tip. Returns the validator's diff.
    pub fn append_micro<TDiff, TValidator>(
        &mut self,
        micro: MicroBlock,
        verifier: &dyn BlockVerifier,
        validator: TValidator,
    ) -> Result<TDiff, ChainError>
    where
        TValidator: FnOnce(i64) -> Result<TDiff, ValidationError>,
    {
        let Some(state) = self.state.as_mut() else {
            return Err(MicroBlockAppendError::NoBase.into());
        };
        if micro.generator() != state.base.generator() {
            return Err(MicroBlockAppendError::WrongGenerator {
                expected: state.base.generator(),
                got: micro.generator(),
            }
            .into());
        }
        match state.micros.front() {
            None => {
                if micro.prev_res_block_sig() != state.base.unique_id() {
                    return Err(MicroBlockAppendError::BlockMicroFork {
                        expected: state.base.unique_id(),
                        got: micro.prev_res_block_sig(),
                    }
                    .into());
                }
            },
            Some(tip) => {
                if micro.prev_res_block_sig() != tip.total_res_block_sig() {
                    return Err(MicroBlockAppendError::MicroMicroFork {
                        expected: tip.total_res_block_sig(),
                        got: micro.prev_res_block_sig(),
                    }
                    .into());
                }
            },
        }
        if !verifier.check_micro_block(&micro) {
            return Err(MicroBlockAppendError::InvalidSignature {
                id: micro.total_res_block_sig(),
            }
            .into());
        }

        let diff = validator(state.base.timestamp())?;
        debug!(target: LOG_TARGET, "Appending {} to liquid block {}", micro, state.base.unique_id());
        state.micros.push_front(micro);
        Ok(diff)
    }

    /// The base block re-signed with the newest total signature and carrying
    /// all microblock transactions in order.
    pub fn best_liquid_block(&self) -> Option<Block> {
        let state = self.state.as_ref()?;
        match state.micros.front() {
            None => Some(state.base.clone()),
            Some(tip) => self
                .forge_prefix_ending_at(tip.total_res_block_sig())
                .map(|(block, _)| block),
        }
    }

    /// Synthesizes the finalized block ending at `id` without mutating the
    /// head: the base re-signed to `id` with the transactions of every
    /// microblock up to and including the one that produced `id`, plus the
    /// discarded suffix (newest first). `None` when `id` is not in the
    /// liquid chain.
    pub fn forge_prefix_ending_at(&self, id: BlockId) -> Option<(Block, Vec<MicroBlock>)> {
        let state = self.state.as_ref()?;
        if id == state.base.unique_id() {
            return Some((state.base.clone(), state.micros.iter().cloned().collect()));
        }

        let mut transactions: Vec<Transaction> = state.base.transactions().to_vec();
        let mut discarded = Vec::new();
        let mut found = false;
        for micro in state.micros.iter().rev() {
            if found {
                discarded.push(micro.clone());
            } else {
                transactions.extend_from_slice(micro.transactions());
                if micro.total_res_block_sig() == id {
                    found = true;
                }
            }
        }
        if !found {
            return None;
        }
        discarded.reverse();
        Some((state.base.with_signature_and_transactions(id, transactions), discarded))
    }
}

#[cfg(test)]
mod tests {
    use flux_common_types::{PublicKey, TxId};

    use super::*;
    use crate::{models::SignerData, AcceptAllVerifier};

    fn id(n: u8) -> BlockId {
        BlockId::from([n; 32])
    }

    fn generator() -> PublicKey {
        PublicKey::from([7u8; 32])
    }

    fn tx(n: u8) -> Transaction {
        Transaction::new(TxId::from([n; 32]), vec![n])
    }

    fn base_block() -> Block {
        Block::new(
            3,
            id(0),
            SignerData {
                generator: generator(),
                signature: id(10),
            },
            1_000,
            50,
            vec![tx(1)],
        )
    }

    fn micro(prev: BlockId, total: BlockId, txs: Vec<Transaction>) -> MicroBlock {
        MicroBlock::new(generator(), prev, total, txs, total)
    }

    fn ok_validator(_base_ts: i64) -> Result<(), ValidationError> {
        Ok(())
    }

    fn head_with_micros() -> LiquidHead {
        let mut head = LiquidHead::new();
        head.set_base(base_block());
        head.append_micro(micro(id(10), id(11), vec![tx(2)]), &AcceptAllVerifier, ok_validator)
            .unwrap();
        head.append_micro(micro(id(11), id(12), vec![tx(3)]), &AcceptAllVerifier, ok_validator)
            .unwrap();
        head
    }

    #[test]
    fn it_rejects_micros_without_a_base() {
        let mut head = LiquidHead::new();
        let err = head
            .append_micro(micro(id(10), id(11), vec![]), &AcceptAllVerifier, ok_validator)
            .unwrap_err();
        assert!(matches!(err, ChainError::MicroBlockAppend(MicroBlockAppendError::NoBase)));
    }

    #[test]
    fn it_rejects_a_foreign_generator() {
        let mut head = LiquidHead::new();
        head.set_base(base_block());
        let foreign = MicroBlock::new(PublicKey::from([9u8; 32]), id(10), id(11), vec![], id(11));
        let err = head.append_micro(foreign, &AcceptAllVerifier, ok_validator).unwrap_err();
        assert!(matches!(
            err,
            ChainError::MicroBlockAppend(MicroBlockAppendError::WrongGenerator { .. })
        ));
    }

    #[test]
    fn it_detects_block_micro_and_micro_micro_forks() {
        let mut head = LiquidHead::new();
        head.set_base(base_block());

        let err = head
            .append_micro(micro(id(99), id(11), vec![]), &AcceptAllVerifier, ok_validator)
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::MicroBlockAppend(MicroBlockAppendError::BlockMicroFork { .. })
        ));

        head.append_micro(micro(id(10), id(11), vec![]), &AcceptAllVerifier, ok_validator)
            .unwrap();
        let err = head
            .append_micro(micro(id(10), id(12), vec![]), &AcceptAllVerifier, ok_validator)
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::MicroBlockAppend(MicroBlockAppendError::MicroMicroFork { .. })
        ));
    }

    #[test]
    fn it_builds_the_best_liquid_block() {
        let head = head_with_micros();
        let best = head.best_liquid_block().unwrap();
        assert_eq!(best.unique_id(), id(12));
        assert_eq!(best.transactions(), &[tx(1), tx(2), tx(3)]);
        // The base itself is untouched
        assert_eq!(head.base().unwrap().unique_id(), id(10));
    }

    #[test]
    fn it_forges_a_prefix_and_discards_the_suffix() {
        let head = head_with_micros();

        let (forged, discarded) = head.forge_prefix_ending_at(id(11)).unwrap();
        assert_eq!(forged.unique_id(), id(11));
        assert_eq!(forged.transactions(), &[tx(1), tx(2)]);
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].total_res_block_sig(), id(12));

        let (forged, discarded) = head.forge_prefix_ending_at(id(10)).unwrap();
        assert_eq!(forged.unique_id(), id(10));
        assert_eq!(forged.transactions(), &[tx(1)]);
        assert_eq!(discarded.len(), 2);

        assert!(head.forge_prefix_ending_at(id(99)).is_none());
    }
}
