//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A 32-byte block id. For NG-capable blocks the id is the signature digest
/// of the signed block body, so a liquid block that is re-signed by a
/// microblock changes its id to the microblock's total signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct BlockId(#[serde(with = "serde_bytes_hex")] [u8; BlockId::BYTE_SIZE]);

impl BlockId {
    pub const BYTE_SIZE: usize = 32;

    pub const fn zero() -> Self {
        Self([0u8; Self::BYTE_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; BlockId::BYTE_SIZE]> for BlockId {
    fn from(bytes: [u8; BlockId::BYTE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for BlockId {
    type Error = IdSizeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; Self::BYTE_SIZE]>::try_from(value).map_err(|_| IdSizeError {
            expected: Self::BYTE_SIZE,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<Vec<u8>> for BlockId {
    type Error = IdSizeError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        value.as_slice().try_into()
    }
}

impl AsRef<[u8]> for BlockId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid id byte size: expected {expected}, got {actual}")]
pub struct IdSizeError {
    pub expected: usize,
    pub actual: usize,
}

pub(crate) mod serde_bytes_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.serialize_str(&hex::encode(bytes))
        } else {
            s.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(d: D) -> Result<[u8; N], D::Error> {
        if d.is_human_readable() {
            let hex_str = <String as Deserialize>::deserialize(d)?;
            let bytes = hex::decode(&hex_str).map_err(serde::de::Error::custom)?;
            bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("invalid byte size"))
        } else {
            let bytes = <Vec<u8> as Deserialize>::deserialize(d)?;
            bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("invalid byte size"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_through_json() {
        let id = BlockId::from([7u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back = serde_json::from_str::<BlockId>(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn it_rejects_wrong_byte_size() {
        let err = BlockId::try_from(vec![1u8; 31]).unwrap_err();
        assert_eq!(err.actual, 31);
    }
}
