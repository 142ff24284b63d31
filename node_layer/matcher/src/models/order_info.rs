//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::LimitOrder;

/// The tracked state of an order through its lifecycle. A default instance
/// (zero amount) stands for an order this node has never seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub amount: i64,
    pub filled: i64,
    pub canceled: bool,
    pub min_amount: Option<i64>,
    pub remaining_fee: i64,
    /// Total actually spent by executions so far, accumulated per fill.
    /// Informational; the reserved-balance math works on the remainder.
    pub unsafe_total_spend: Option<i64>,
}

impl OrderInfo {
    pub fn accepted(lo: &LimitOrder) -> Self {
        Self {
            amount: lo.amount,
            filled: 0,
            canceled: false,
            min_amount: Some(lo.min_amount()),
            remaining_fee: lo.fee,
            unsafe_total_spend: Some(0),
        }
    }

    pub fn remaining(&self) -> i64 {
        if self.canceled {
            0
        } else {
            self.amount - self.filled
        }
    }

    /// The smallest amount a further execution could take off this order.
    pub fn min_step(&self) -> i64 {
        self.min_amount.unwrap_or(1).max(1)
    }

    /// An order whose remainder is below the minimum executable step can
    /// never trade again and counts as filled.
    pub fn status(&self) -> OrderStatus {
        if self.amount == 0 {
            OrderStatus::NotFound
        } else if self.canceled {
            OrderStatus::Cancelled(self.filled)
        } else if self.filled == 0 {
            OrderStatus::Accepted
        } else if self.amount - self.filled < self.min_step() {
            OrderStatus::Filled(self.filled)
        } else {
            OrderStatus::PartiallyFilled(self.filled)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    NotFound,
    Accepted,
    PartiallyFilled(i64),
    Filled(i64),
    Cancelled(i64),
}

impl OrderStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Accepted | OrderStatus::PartiallyFilled(_))
    }

    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Filled(_) | OrderStatus::Cancelled(_))
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::NotFound => write!(f, "NotFound"),
            OrderStatus::Accepted => write!(f, "Accepted"),
            OrderStatus::PartiallyFilled(filled) => write!(f, "PartiallyFilled({})", filled),
            OrderStatus::Filled(filled) => write!(f, "Filled({})", filled),
            OrderStatus::Cancelled(filled) => write!(f, "Cancelled({})", filled),
        }
    }
}

#[cfg(test)]
mod tests {
    use flux_common_types::{Asset, OrderId, PublicKey};

    use super::*;
    use crate::models::{AssetPair, Order, OrderSide};

    fn info(amount: i64, filled: i64, canceled: bool, min_amount: i64) -> OrderInfo {
        OrderInfo {
            amount,
            filled,
            canceled,
            min_amount: Some(min_amount),
            remaining_fee: 0,
            unsafe_total_spend: None,
        }
    }

    #[test]
    fn it_derives_the_lifecycle_statuses() {
        assert_eq!(OrderInfo::default().status(), OrderStatus::NotFound);
        assert_eq!(info(100, 0, false, 1).status(), OrderStatus::Accepted);
        assert_eq!(info(100, 40, false, 1).status(), OrderStatus::PartiallyFilled(40));
        assert_eq!(info(100, 100, false, 1).status(), OrderStatus::Filled(100));
        assert_eq!(info(100, 40, true, 1).status(), OrderStatus::Cancelled(40));
    }

    #[test]
    fn it_treats_a_sub_step_remainder_as_filled() {
        // 5363 left but nothing below 420169 can execute
        assert_eq!(info(425_532, 420_169, false, 420_169).status(), OrderStatus::Filled(420_169));
    }

    #[test]
    fn it_seeds_info_from_a_limit_order() {
        let order = Order {
            id: OrderId::from([1u8; 32]),
            sender: PublicKey::from([2u8; 32]),
            pair: AssetPair {
                amount_asset: Asset::NATIVE,
                price_asset: Asset::NATIVE,
            },
            side: OrderSide::Sell,
            price: 80_000,
            amount: 2_000,
            matcher_fee: 500,
            timestamp: 1,
        };
        let info = OrderInfo::accepted(&LimitOrder::new(order));
        assert_eq!(info.amount, 2_000);
        assert_eq!(info.remaining_fee, 500);
        assert_eq!(info.min_step(), 1_250);
        assert_eq!(info.status(), OrderStatus::Accepted);
    }
}
