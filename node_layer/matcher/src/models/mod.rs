//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

mod order;
pub use order::{
    corrected_amount,
    prorated_fee,
    settled_total,
    AssetPair,
    LimitOrder,
    Order,
    OrderSide,
    ORDER_PRICE_CONSTANT,
};

mod order_info;
pub use order_info::{OrderInfo, OrderStatus};
