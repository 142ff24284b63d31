//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use flux_common_types::optional::IsNotFoundError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{item} not found with key {key}")]
    NotFound { item: &'static str, key: String },
    #[error("Failed to encode {item}: {details}")]
    EncodeError { item: &'static str, details: String },
    #[error("Failed to decode {item}: {details}")]
    DecodeError { item: &'static str, details: String },
    #[error("Store lock poisoned while {operation}")]
    LockPoisoned { operation: &'static str },
}

impl StorageError {
    pub fn not_found(item: &'static str, key: &[u8]) -> Self {
        Self::NotFound {
            item,
            key: hex::encode(key),
        }
    }
}

impl IsNotFoundError for StorageError {
    fn is_not_found_error(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
