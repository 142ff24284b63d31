//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use flux_common_types::{Asset, OrderId, PublicKey};

/// Prices are fixed-point with 8 decimals: a price of 1.0 price-asset units
/// per amount-asset unit is stored as 10^8.
pub const ORDER_PRICE_CONSTANT: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    pub amount_asset: Asset,
    pub price_asset: Asset,
}

/// A signed limit order as delivered by the order parser. Signature and
/// sender checks happen before an order reaches this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub sender: PublicKey,
    pub pair: AssetPair,
    pub side: OrderSide,
    pub price: i64,
    pub amount: i64,
    pub matcher_fee: i64,
    pub timestamp: i64,
}

impl Order {
    /// The asset this order pays out of: the price asset for a buy, the
    /// amount asset for a sell.
    pub fn spend_asset(&self) -> Asset {
        match self.side {
            OrderSide::Buy => self.pair.price_asset,
            OrderSide::Sell => self.pair.amount_asset,
        }
    }

    pub fn receive_asset(&self) -> Asset {
        match self.side {
            OrderSide::Buy => self.pair.amount_asset,
            OrderSide::Sell => self.pair.price_asset,
        }
    }

    /// The smallest executable amount-asset quantity at this price: anything
    /// less settles to zero whole price-asset units.
    pub fn min_amount_of_amount_asset(&self) -> i64 {
        ceil_div(ORDER_PRICE_CONSTANT as i128, self.price as i128).max(1)
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order[{}, {} {} @ {} by {}]",
            self.id, self.side, self.amount, self.price, self.sender
        )
    }
}

/// An order together with the portion of it an event refers to: the full
/// amount and fee for a fresh order, the unfilled remainder when the
/// matching engine re-offers one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub amount: i64,
    pub fee: i64,
    pub order: Order,
}

impl LimitOrder {
    pub fn new(order: Order) -> Self {
        Self {
            amount: order.amount,
            fee: order.matcher_fee,
            order,
        }
    }

    pub fn partial(order: Order, amount: i64, fee: i64) -> Self {
        Self { amount, fee, order }
    }

    pub fn id(&self) -> OrderId {
        self.order.id
    }

    pub fn sender(&self) -> PublicKey {
        self.order.sender
    }

    pub fn min_amount(&self) -> i64 {
        self.order.min_amount_of_amount_asset()
    }
}

/// The whole number of price-asset units settled by `amount` at `price`,
/// rounded down.
pub fn settled_total(amount: i64, price: i64) -> i64 {
    ((amount as i128 * price as i128) / ORDER_PRICE_CONSTANT as i128) as i64
}

/// Clamps `amount` down to the smallest quantity that settles the same
/// whole-number total, so an execution never spends a fractional price-asset
/// unit.
pub fn corrected_amount(amount: i64, price: i64) -> i64 {
    let settled = settled_total(amount, price) as i128;
    ceil_div(settled * ORDER_PRICE_CONSTANT as i128, price as i128)
}

/// The matcher fee outstanding for an order with `remaining` of `amount`
/// left, rounded up so the matcher never under-collects.
pub fn prorated_fee(matcher_fee: i64, remaining: i64, amount: i64) -> i64 {
    ceil_div(matcher_fee as i128 * remaining as i128, amount as i128)
}

fn ceil_div(numerator: i128, denominator: i128) -> i64 {
    ((numerator + denominator - 1) / denominator) as i64
}
