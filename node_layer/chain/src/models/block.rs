//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use flux_common_types::{BlockId, PublicKey};

use super::Transaction;

/// Lowest block version that may carry microblocks on top of it.
pub const NG_MIN_BLOCK_VERSION: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerData {
    pub generator: PublicKey,
    pub signature: BlockId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    version: u8,
    reference: BlockId,
    signer_data: SignerData,
    timestamp: i64,
    block_score: u64,
    transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        version: u8,
        reference: BlockId,
        signer_data: SignerData,
        timestamp: i64,
        block_score: u64,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            version,
            reference,
            signer_data,
            timestamp,
            block_score,
            transactions,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn supports_microblocks(&self) -> bool {
        self.version >= NG_MIN_BLOCK_VERSION
    }

    pub fn reference(&self) -> BlockId {
        self.reference
    }

    pub fn generator(&self) -> PublicKey {
        self.signer_data.generator
    }

    pub fn signature(&self) -> BlockId {
        self.signer_data.signature
    }

    /// The block id. Derived from the signed body, which for NG blocks means
    /// the signature digest itself: re-signing a liquid block changes its id.
    pub fn unique_id(&self) -> BlockId {
        self.signer_data.signature
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn block_score(&self) -> u64 {
        self.block_score
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// A copy of this block carrying a replacement signature (and therefore
    /// id) and transaction list. This is how a forged block is materialized
    /// out of a base block and a microblock prefix.
    pub fn with_signature_and_transactions(&self, signature: BlockId, transactions: Vec<Transaction>) -> Block {
        Block {
            signer_data: SignerData {
                generator: self.signer_data.generator,
                signature,
            },
            transactions,
            ..self.clone()
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Block[id: {}, ref: {}, txs: {}, score: {}]",
            self.unique_id(),
            self.reference,
            self.transactions.len(),
            self.block_score
        )
    }
}
