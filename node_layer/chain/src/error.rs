//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use flux_common_types::{optional::IsNotFoundError, BlockId, PublicKey};
use flux_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Block append error: {0}")]
    BlockAppend(#[from] BlockAppendError),
    #[error("Microblock append error: {0}")]
    MicroBlockAppend(#[from] MicroBlockAppendError),
    #[error("Consensus validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("History store is inconsistent: {details}")]
    StoreInconsistent { details: String },
}

impl ChainError {
    /// Fatal errors indicate corrupted node state and must reach an
    /// operator rather than being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChainError::StoreInconsistent { .. } |
                ChainError::BlockAppend(BlockAppendError::InvalidForgedSignature { .. })
        )
    }
}

impl IsNotFoundError for ChainError {
    fn is_not_found_error(&self) -> bool {
        matches!(self, ChainError::StorageError(e) if e.is_not_found_error())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlockAppendError {
    #[error("References incorrect: block refers to {reference} but the last block is {expected}")]
    ParentMismatch { reference: BlockId, expected: BlockId },
    #[error("A liquid block exists, but {reference} refers to neither it nor any of its microblocks")]
    LiquidReferenceUnknown { reference: BlockId },
    #[error("BUG: forged block {id} failed the signature self-check")]
    InvalidForgedSignature { id: BlockId },
}

#[derive(Debug, thiserror::Error)]
pub enum MicroBlockAppendError {
    #[error("No base block to append the microblock to")]
    NoBase,
    #[error("Microblock generator {got} does not match the base block generator {expected}")]
    WrongGenerator { expected: PublicKey, got: PublicKey },
    #[error("Microblock references {got} instead of the base block {expected}")]
    BlockMicroFork { expected: BlockId, got: BlockId },
    #[error("Microblock references {got} instead of the newest microblock {expected}")]
    MicroMicroFork { expected: BlockId, got: BlockId },
    #[error("Microblock {id} has an invalid signature")]
    InvalidSignature { id: BlockId },
}

/// Opaque rejection from the caller-supplied consensus validator. The core
/// surfaces it verbatim.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(#[from] pub anyhow::Error);
