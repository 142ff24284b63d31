//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use crate::models::LimitOrder;

/// The three events the matching engine publishes against the order history.
#[derive(Debug, Clone)]
pub enum OrderEvent {
    Added(LimitOrder),
    Executed {
        submitted: LimitOrder,
        counter: LimitOrder,
    },
    Cancelled {
        order: LimitOrder,
        /// Set when the engine cancels a dust remainder that can never
        /// match, as opposed to a user cancellation.
        unmatchable: bool,
    },
}

/// What is left of both sides after an execution. The engine re-offers the
/// unfilled submitted side by publishing `Added(submitted_remaining)`.
#[derive(Debug, Clone)]
pub struct ExecutedRemainders {
    pub executed_amount: i64,
    pub submitted_remaining: LimitOrder,
    pub counter_remaining: LimitOrder,
}
