//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use flux_common_types::{BlockId, PublicKey};

use super::Transaction;

/// An incremental extension of the liquid block. Each microblock references
/// the current tip signature (`prev_res_block_sig`) and carries the new
/// signature of the resulting liquid block (`total_res_block_sig`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroBlock {
    generator: PublicKey,
    prev_res_block_sig: BlockId,
    total_res_block_sig: BlockId,
    transactions: Vec<Transaction>,
    signature: BlockId,
}

impl MicroBlock {
    pub fn new(
        generator: PublicKey,
        prev_res_block_sig: BlockId,
        total_res_block_sig: BlockId,
        transactions: Vec<Transaction>,
        signature: BlockId,
    ) -> Self {
        Self {
            generator,
            prev_res_block_sig,
            total_res_block_sig,
            transactions,
            signature,
        }
    }

    pub fn generator(&self) -> PublicKey {
        self.generator
    }

    pub fn prev_res_block_sig(&self) -> BlockId {
        self.prev_res_block_sig
    }

    pub fn total_res_block_sig(&self) -> BlockId {
        self.total_res_block_sig
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn signature(&self) -> BlockId {
        self.signature
    }
}

impl Display for MicroBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MicroBlock[total: {}, prev: {}, txs: {}]",
            self.total_res_block_sig,
            self.prev_res_block_sig,
            self.transactions.len()
        )
    }
}
