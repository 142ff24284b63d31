//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{block_id::serde_bytes_hex, IdSizeError};

/// An account public key. Key material and address derivation belong to the
/// crypto collaborator; here the key is an opaque 32-byte account identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct PublicKey(#[serde(with = "serde_bytes_hex")] [u8; PublicKey::BYTE_SIZE]);

impl PublicKey {
    pub const BYTE_SIZE: usize = 32;

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; PublicKey::BYTE_SIZE]> for PublicKey {
    fn from(bytes: [u8; PublicKey::BYTE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = IdSizeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; Self::BYTE_SIZE]>::try_from(value).map_err(|_| IdSizeError {
            expected: Self::BYTE_SIZE,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
