//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

mod block;
pub use block::{Block, SignerData, NG_MIN_BLOCK_VERSION};

mod micro_block;
pub use micro_block::MicroBlock;

mod transaction;
pub use transaction::Transaction;
