//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

mod error;
pub use error::{BlockAppendError, ChainError, MicroBlockAppendError, ValidationError};

mod history_store;
pub use history_store::HistoryStore;

mod hooks;
pub use hooks::{ChainHooks, NoopChainHooks};

mod liquid_head;
pub use liquid_head::LiquidHead;

pub mod metrics;

pub mod models;

mod verifier;
pub use verifier::{AcceptAllVerifier, BlockVerifier};

mod writer;
pub use writer::NgChain;
