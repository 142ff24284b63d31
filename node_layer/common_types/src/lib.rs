//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

mod asset;
pub use asset::{Asset, AssetId};

mod block_id;
pub use block_id::{BlockId, IdSizeError};

pub mod optional;

mod order_id;
pub use order_id::OrderId;

mod public_key;
pub use public_key::PublicKey;

mod tx_id;
pub use tx_id::TxId;
