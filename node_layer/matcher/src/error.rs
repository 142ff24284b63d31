//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use flux_common_types::{optional::IsNotFoundError, Asset, PublicKey};
use flux_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("BUG: reserved balance of {sender} for asset {asset} would become negative ({value})")]
    NegativeReservedBalance {
        sender: PublicKey,
        asset: Asset,
        value: i64,
    },
}

impl MatcherError {
    /// A fatal error means the accounting state machine itself is broken.
    /// The event transaction is rolled back and an operator must intervene.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MatcherError::NegativeReservedBalance { .. })
    }
}

impl IsNotFoundError for MatcherError {
    fn is_not_found_error(&self) -> bool {
        matches!(self, MatcherError::StorageError(e) if e.is_not_found_error())
    }
}
