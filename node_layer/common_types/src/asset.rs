//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{block_id::serde_bytes_hex, IdSizeError};

/// Id of an issued asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct AssetId(#[serde(with = "serde_bytes_hex")] [u8; AssetId::BYTE_SIZE]);

impl AssetId {
    pub const BYTE_SIZE: usize = 32;

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; AssetId::BYTE_SIZE]> for AssetId {
    fn from(bytes: [u8; AssetId::BYTE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for AssetId {
    type Error = IdSizeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; Self::BYTE_SIZE]>::try_from(value).map_err(|_| IdSizeError {
            expected: Self::BYTE_SIZE,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Either an issued asset or the chain's native asset. The native asset has
/// no id of its own, so map keys use a one-byte tag followed by a fixed-width
/// (possibly zero) id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Asset(Option<AssetId>);

impl Asset {
    pub const KEY_BYTE_SIZE: usize = 1 + AssetId::BYTE_SIZE;
    pub const NATIVE: Asset = Asset(None);

    pub fn of(id: AssetId) -> Self {
        Self(Some(id))
    }

    pub fn is_native(&self) -> bool {
        self.0.is_none()
    }

    pub fn id(&self) -> Option<&AssetId> {
        self.0.as_ref()
    }

    /// Fixed-width key encoding: `0x00` padding for the native asset,
    /// `0x01 ‖ id` otherwise. Fixed width keeps composite index keys
    /// parseable at constant offsets.
    pub fn key_bytes(&self) -> [u8; Self::KEY_BYTE_SIZE] {
        let mut buf = [0u8; Self::KEY_BYTE_SIZE];
        if let Some(id) = self.0 {
            buf[0] = 1;
            buf[1..].copy_from_slice(id.as_bytes());
        }
        buf
    }

    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, IdSizeError> {
        if bytes.len() != Self::KEY_BYTE_SIZE {
            return Err(IdSizeError {
                expected: Self::KEY_BYTE_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0] == 0 {
            return Ok(Self::NATIVE);
        }
        Ok(Self(Some(AssetId::try_from(&bytes[1..])?)))
    }
}

impl From<Option<AssetId>> for Asset {
    fn from(id: Option<AssetId>) -> Self {
        Self(id)
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(id) => write!(f, "{}", id),
            None => write!(f, "native"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_key_bytes() {
        let issued = Asset::of(AssetId::from([9u8; 32]));
        assert_eq!(Asset::from_key_bytes(&issued.key_bytes()).unwrap(), issued);
        assert_eq!(Asset::from_key_bytes(&Asset::NATIVE.key_bytes()).unwrap(), Asset::NATIVE);
    }

    #[test]
    fn it_orders_native_before_issued_assets() {
        let issued = Asset::of(AssetId::from([0u8; 32]));
        assert!(Asset::NATIVE.key_bytes() < issued.key_bytes());
    }
}
