//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use indexmap::IndexMap;

use flux_common_types::Asset;

use crate::models::{settled_total, Order, OrderInfo, OrderSide};

/// The spend and fee obligations an order imposes per asset, given its
/// current info. Terminal orders impose nothing.
///
/// The fee is owed in the native asset. When the order also *receives*
/// native, the incoming funds cover the outstanding fee first and only the
/// uncovered part stays reserved (fee netting).
pub fn open_obligations(order: &Order, info: &OrderInfo) -> IndexMap<Asset, i64> {
    let mut obligations = IndexMap::new();
    if !info.status().is_active() {
        return obligations;
    }

    let remaining = info.remaining();
    let (spend, receive) = match order.side {
        OrderSide::Buy => (settled_total(remaining, order.price), remaining),
        OrderSide::Sell => (remaining, settled_total(remaining, order.price)),
    };
    if spend > 0 {
        *obligations.entry(order.spend_asset()).or_insert(0) += spend;
    }

    let fee = if order.receive_asset().is_native() {
        (info.remaining_fee - receive).max(0)
    } else {
        info.remaining_fee
    };
    if fee > 0 {
        *obligations.entry(Asset::NATIVE).or_insert(0) += fee;
    }

    obligations
}

/// Per-asset reserved-balance change when an order moves from `old` to
/// `new`. Negative entries release reservation.
pub fn obligation_delta(order: &Order, old: &OrderInfo, new: &OrderInfo) -> IndexMap<Asset, i64> {
    let mut delta = open_obligations(order, new);
    for (asset, amount) in open_obligations(order, old) {
        *delta.entry(asset).or_insert(0) -= amount;
    }
    delta.retain(|_, change| *change != 0);
    delta
}

#[cfg(test)]
mod tests {
    use flux_common_types::{AssetId, OrderId, PublicKey};

    use super::*;
    use crate::models::{AssetPair, LimitOrder, OrderInfo};

    fn asset(tag: u8) -> Asset {
        Asset::of(AssetId::from([tag; 32]))
    }

    fn order(side: OrderSide, pair: AssetPair, price: i64, amount: i64, fee: i64) -> Order {
        Order {
            id: OrderId::from([1u8; 32]),
            sender: PublicKey::from([2u8; 32]),
            pair,
            side,
            price,
            amount,
            matcher_fee: fee,
            timestamp: 1,
        }
    }

    #[test]
    fn it_reserves_spend_and_full_fee_for_a_non_native_receive() {
        // Buy 10000 WCT at 0.0007 BTC, fee in native
        let order = order(
            OrderSide::Buy,
            AssetPair {
                amount_asset: asset(1),
                price_asset: asset(2),
            },
            70_000,
            10_000,
            300_000,
        );
        let info = OrderInfo::accepted(&LimitOrder::new(order.clone()));
        let obligations = open_obligations(&order, &info);
        assert_eq!(obligations.get(&asset(2)), Some(&7));
        assert_eq!(obligations.get(&Asset::NATIVE), Some(&300_000));
        assert_eq!(obligations.get(&asset(1)), None);
    }

    #[test]
    fn it_nets_the_fee_against_a_native_receive() {
        // Buy receiving native: 100000 native incoming covers the 1000 fee
        let order = order(
            OrderSide::Buy,
            AssetPair {
                amount_asset: Asset::NATIVE,
                price_asset: asset(2),
            },
            1_000_000,
            100_000,
            1_000,
        );
        let info = OrderInfo::accepted(&LimitOrder::new(order.clone()));
        let obligations = open_obligations(&order, &info);
        assert_eq!(obligations.get(&asset(2)), Some(&1_000));
        assert_eq!(obligations.get(&Asset::NATIVE), None);
    }

    #[test]
    fn it_reserves_only_the_uncovered_fee_part() {
        // Sell receiving native: 70 native incoming against a 100 fee
        let order = order(
            OrderSide::Sell,
            AssetPair {
                amount_asset: asset(1),
                price_asset: Asset::NATIVE,
            },
            70_000_000,
            100,
            100,
        );
        let info = OrderInfo::accepted(&LimitOrder::new(order.clone()));
        let obligations = open_obligations(&order, &info);
        assert_eq!(obligations.get(&asset(1)), Some(&100));
        assert_eq!(obligations.get(&Asset::NATIVE), Some(&30));
    }

    #[test]
    fn it_sums_native_spend_and_fee_for_a_native_sell() {
        // Sell native for BTC: the whole remainder plus the fee is locked
        let order = order(
            OrderSide::Sell,
            AssetPair {
                amount_asset: Asset::NATIVE,
                price_asset: asset(2),
            },
            70_000,
            100_000,
            1_000,
        );
        let info = OrderInfo::accepted(&LimitOrder::new(order.clone()));
        let obligations = open_obligations(&order, &info);
        assert_eq!(obligations.get(&Asset::NATIVE), Some(&101_000));
    }

    #[test]
    fn it_releases_everything_when_an_order_closes() {
        let order = order(
            OrderSide::Buy,
            AssetPair {
                amount_asset: asset(1),
                price_asset: asset(2),
            },
            70_000,
            10_000,
            300_000,
        );
        let open = OrderInfo::accepted(&LimitOrder::new(order.clone()));
        let closed = OrderInfo { canceled: true, ..open.clone() };
        let delta = obligation_delta(&order, &open, &closed);
        assert_eq!(delta.get(&asset(2)), Some(&-7));
        assert_eq!(delta.get(&Asset::NATIVE), Some(&-300_000));
    }
}
