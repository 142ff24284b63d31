//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

mod error;
pub use error::MatcherError;

mod events;
pub use events::{ExecutedRemainders, OrderEvent};

pub mod models;

mod order_history;
pub use order_history::OrderHistory;

mod order_store;

mod reserved;
pub use reserved::{obligation_delta, open_obligations};
