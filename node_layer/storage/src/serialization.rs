//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{de::DeserializeOwned, Serialize};

use crate::StorageError;

pub fn serialize_json<T: Serialize>(item: &'static str, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::EncodeError {
        item,
        details: e.to_string(),
    })
}

pub fn deserialize_json<T: DeserializeOwned>(item: &'static str, bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::DecodeError {
        item,
        details: e.to_string(),
    })
}
