//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use crate::models::{Block, MicroBlock};

/// Structural signature checks, supplied by the block parser/crypto
/// collaborator. The chain core calls this for every appended microblock and
/// for the self-check on every forged block.
pub trait BlockVerifier: Send + Sync {
    fn check_block(&self, block: &Block) -> bool;

    fn check_micro_block(&self, micro: &MicroBlock) -> bool;
}

/// Verifier that accepts everything. For wiring tests and tools that operate
/// on pre-verified blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllVerifier;

impl BlockVerifier for AcceptAllVerifier {
    fn check_block(&self, _block: &Block) -> bool {
        true
    }

    fn check_micro_block(&self, _micro: &MicroBlock) -> bool {
        true
    }
}
