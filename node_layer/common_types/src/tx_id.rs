//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{block_id::serde_bytes_hex, IdSizeError};

/// Opaque transaction id. Transaction bodies are parsed and verified by an
/// external collaborator; the node layer only carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct TxId(#[serde(with = "serde_bytes_hex")] [u8; TxId::BYTE_SIZE]);

impl TxId {
    pub const BYTE_SIZE: usize = 32;

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; TxId::BYTE_SIZE]> for TxId {
    fn from(bytes: [u8; TxId::BYTE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for TxId {
    type Error = IdSizeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; Self::BYTE_SIZE]>::try_from(value).map_err(|_| IdSizeError {
            expected: Self::BYTE_SIZE,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for TxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
