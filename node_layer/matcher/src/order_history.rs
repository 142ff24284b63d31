//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use indexmap::IndexMap;
use log::*;

use flux_common_types::{optional::Optional, Asset, OrderId, PublicKey};
use flux_storage::{serialize_json, KeyValueStore, KvReadTransaction, KvWriteTransaction};

use crate::{
    models::{
        corrected_amount,
        prorated_fee,
        settled_total,
        AssetPair,
        LimitOrder,
        Order,
        OrderInfo,
        OrderSide,
        OrderStatus,
    },
    order_store::{
        active_index_key,
        active_pair_prefix,
        active_prefix,
        all_index_key,
        asset_of_reserved_key,
        order_info_get,
        order_info_put,
        order_meta_get,
        order_meta_put,
        reserved_get,
        reserved_set,
        status_snapshot_put,
        timestamp_and_id_of_index_key,
        MAP_ACTIVE_INDEX,
        MAP_ALL_INDEX,
        MAP_ORDER_INFO,
        MAP_ORDER_META,
        MAP_RESERVED,
    },
    reserved::{obligation_delta, open_obligations},
    ExecutedRemainders,
    MatcherError,
    OrderEvent,
};

const LOG_TARGET: &str = "flux::matcher::order_history";

/// Tracks every order through its lifecycle and keeps, per account, the
/// exact amount of each asset locked against open orders. Events are applied
/// one per store transaction under the store's exclusive writer, which
/// serializes them; readers observe committed state only.
#[derive(Debug, Clone)]
pub struct OrderHistory<TStore> {
    store: TStore,
}

impl<TStore: KeyValueStore> OrderHistory<TStore> {
    pub fn new(store: TStore) -> Self {
        Self { store }
    }

    /// Applies one matching-engine event. `Executed` yields the remainders
    /// of both sides for the engine's follow-up `Added`.
    pub fn process(&self, event: OrderEvent) -> Result<Option<ExecutedRemainders>, MatcherError> {
        match event {
            OrderEvent::Added(lo) => {
                self.order_added(&lo)?;
                Ok(None)
            },
            OrderEvent::Executed { submitted, counter } => Ok(Some(self.order_executed(&submitted, &counter)?)),
            OrderEvent::Cancelled { order, unmatchable } => {
                self.order_cancelled(&order, unmatchable)?;
                Ok(None)
            },
        }
    }

    /// Starts tracking an order, reserving its full spend and fee
    /// obligation. Re-adding a tracked, non-cancelled order is a no-op, so
    /// the engine can re-offer an execution remainder without
    /// double-reserving.
    pub fn order_added(&self, lo: &LimitOrder) -> Result<(), MatcherError> {
        self.store.with_write_tx(|tx| {
            if let Some(existing) = order_info_get(tx, &lo.order.id).optional()? {
                if !existing.canceled {
                    debug!(
                        target: LOG_TARGET,
                        "Order {} already tracked ({}), ignoring re-add", lo.order.id, existing.status()
                    );
                    return Ok(());
                }
            }
            info!(target: LOG_TARGET, "Order accepted: {}", lo.order);
            install_order(tx, lo)?;
            Ok(())
        })
    }

    /// Applies a trade between the incoming `submitted` order and the
    /// resting `counter` order. The executed amount is the smaller remainder
    /// clamped to the counter's price step. Both sides' fills, prorated fees
    /// and reservations move in one transaction.
    pub fn order_executed(
        &self,
        submitted: &LimitOrder,
        counter: &LimitOrder,
    ) -> Result<ExecutedRemainders, MatcherError> {
        self.store.with_write_tx(|tx| {
            let executed_amount = corrected_amount(submitted.amount.min(counter.amount), counter.order.price);
            info!(
                target: LOG_TARGET,
                "Executing {} against {} for {}", submitted.order.id, counter.order.id, executed_amount
            );
            let submitted_remaining = execute_side(tx, submitted, executed_amount)?;
            let counter_remaining = execute_side(tx, counter, executed_amount)?;
            Ok(ExecutedRemainders {
                executed_amount,
                submitted_remaining,
                counter_remaining,
            })
        })
    }

    /// Cancels an order, releasing its whole outstanding obligation. A
    /// no-op for unknown or already-closed orders.
    pub fn order_cancelled(&self, lo: &LimitOrder, unmatchable: bool) -> Result<(), MatcherError> {
        self.store.with_write_tx(|tx| {
            let order = &lo.order;
            let Some(info) = order_info_get(tx, &order.id).optional()? else {
                return Ok(());
            };
            if !info.status().is_active() {
                debug!(target: LOG_TARGET, "Order {} already closed ({}), ignoring cancel", order.id, info.status());
                return Ok(());
            }
            let new_info = OrderInfo { canceled: true, ..info };
            apply_reserved_delta(tx, order.sender, &obligation_delta(order, &info, &new_info))?;
            order_info_put(tx, &order.id, &new_info)?;
            tx.delete(MAP_ACTIVE_INDEX, &active_index_key(order))?;
            status_snapshot_put(tx, order, &new_info.status())?;
            info!(
                target: LOG_TARGET,
                "Order cancelled{}: {}",
                if unmatchable { " (unmatchable remainder)" } else { "" },
                order
            );
            Ok(())
        })
    }

    /// The tracked state of an order; a default (NotFound) info for unknown
    /// ids.
    pub fn order_info(&self, id: &OrderId) -> Result<OrderInfo, MatcherError> {
        self.store
            .with_read_tx(|tx| Ok(order_info_get(tx, id).optional()?.unwrap_or_default()))
    }

    pub fn order_status(&self, id: &OrderId) -> Result<OrderStatus, MatcherError> {
        Ok(self.order_info(id)?.status())
    }

    pub fn order_by_id(&self, id: &OrderId) -> Result<Option<Order>, MatcherError> {
        self.store.with_read_tx(|tx| Ok(order_meta_get(tx, id).optional()?))
    }

    /// Reserved amounts per asset for an account.
    pub fn reserved_balance(&self, sender: &PublicKey) -> Result<IndexMap<Asset, i64>, MatcherError> {
        self.store.with_read_tx(|tx| {
            let mut balances = IndexMap::new();
            for (key, value) in tx.scan_prefix(MAP_RESERVED, sender.as_bytes())? {
                let asset = asset_of_reserved_key(&key)?;
                balances.insert(asset, flux_storage::deserialize_json("reserved balance", &value)?);
            }
            Ok(balances)
        })
    }

    pub fn reserved_balance_of(&self, sender: &PublicKey, asset: &Asset) -> Result<i64, MatcherError> {
        self.store.with_read_tx(|tx| Ok(reserved_get(tx, sender, asset)?))
    }

    /// Open order ids of an account, newest first.
    pub fn active_order_ids(&self, sender: &PublicKey) -> Result<Vec<OrderId>, MatcherError> {
        self.store
            .with_read_tx(|tx| collect_ids_newest_first(tx.scan_prefix(MAP_ACTIVE_INDEX, &active_prefix(sender))?))
    }

    /// Open order ids of an account for one asset pair, newest first.
    pub fn active_order_ids_for_pair(&self, sender: &PublicKey, pair: &AssetPair) -> Result<Vec<OrderId>, MatcherError> {
        self.store.with_read_tx(|tx| {
            collect_ids_newest_first(tx.scan_prefix(
                MAP_ACTIVE_INDEX,
                &active_pair_prefix(sender, &pair.amount_asset, &pair.price_asset),
            )?)
        })
    }

    /// All order ids of an account: open orders first, then closed ones,
    /// each group newest first.
    pub fn all_order_ids(&self, sender: &PublicKey) -> Result<Vec<OrderId>, MatcherError> {
        self.store.with_read_tx(|tx| {
            let mut open = Vec::new();
            let mut closed = Vec::new();
            for (key, value) in tx.scan_prefix(MAP_ALL_INDEX, sender.as_bytes())? {
                let (timestamp, id) = timestamp_and_id_of_index_key("all_index", &key)?;
                let status: OrderStatus = flux_storage::deserialize_json("order status", &value)?;
                if status.is_active() {
                    open.push((timestamp, id));
                } else {
                    closed.push((timestamp, id));
                }
            }
            open.sort_by(|a, b| b.cmp(a));
            closed.sort_by(|a, b| b.cmp(a));
            Ok(open.into_iter().chain(closed).map(|(_, id)| id).collect())
        })
    }

    /// Removes a closed order from the history. Returns `false` (and leaves
    /// everything in place) while the order is still open or unknown.
    pub fn delete_order(&self, sender: &PublicKey, id: &OrderId) -> Result<bool, MatcherError> {
        self.store.with_write_tx(|tx| {
            let Some(info) = order_info_get(tx, id).optional()? else {
                return Ok(false);
            };
            if !info.status().is_final() {
                return Ok(false);
            }
            let Some(order) = order_meta_get(tx, id).optional()? else {
                return Ok(false);
            };
            if order.sender != *sender {
                return Ok(false);
            }
            tx.delete(MAP_ORDER_INFO, id.as_bytes())?;
            tx.delete(MAP_ORDER_META, id.as_bytes())?;
            tx.delete(MAP_ALL_INDEX, &all_index_key(sender, order.timestamp, id))?;
            info!(target: LOG_TARGET, "Order {} deleted from history", id);
            Ok(true)
        })
    }
}

/// Installs fresh tracking state for `lo` and reserves its full obligation.
/// Also used when an execution arrives for an order the engine never
/// announced: the implicit install keeps the reserved-balance accounting
/// balanced.
fn install_order<T: KvWriteTransaction>(tx: &mut T, lo: &LimitOrder) -> Result<OrderInfo, MatcherError> {
    let order = &lo.order;
    let info = OrderInfo::accepted(lo);
    order_info_put(tx, &order.id, &info)?;
    order_meta_put(tx, order)?;
    tx.put(MAP_ACTIVE_INDEX, active_index_key(order), serialize_json("active flag", &true)?)?;
    status_snapshot_put(tx, order, &info.status())?;
    apply_reserved_delta(tx, order.sender, &open_obligations(order, &info))?;
    Ok(info)
}

fn execute_side<T: KvWriteTransaction>(
    tx: &mut T,
    lo: &LimitOrder,
    executed_amount: i64,
) -> Result<LimitOrder, MatcherError> {
    let order = &lo.order;
    let old_info = match order_info_get(tx, &order.id).optional()? {
        Some(info) => info,
        None => install_order(tx, lo)?,
    };

    let new_filled = (old_info.filled + executed_amount).min(old_info.amount);
    let new_remaining_fee = if old_info.amount == 0 {
        0
    } else {
        prorated_fee(order.matcher_fee, old_info.amount - new_filled, old_info.amount)
    };
    let spend_chunk = match order.side {
        OrderSide::Buy => settled_total(executed_amount, order.price),
        OrderSide::Sell => executed_amount,
    };
    let new_info = OrderInfo {
        filled: new_filled,
        remaining_fee: new_remaining_fee,
        unsafe_total_spend: Some(old_info.unsafe_total_spend.unwrap_or(0) + spend_chunk),
        ..old_info
    };

    apply_reserved_delta(tx, order.sender, &obligation_delta(order, &old_info, &new_info))?;
    order_info_put(tx, &order.id, &new_info)?;
    status_snapshot_put(tx, order, &new_info.status())?;
    if !new_info.status().is_active() {
        tx.delete(MAP_ACTIVE_INDEX, &active_index_key(order))?;
    }
    debug!(
        target: LOG_TARGET,
        "Order {} now {} (remaining fee {})", order.id, new_info.status(), new_remaining_fee
    );

    Ok(LimitOrder::partial(order.clone(), lo.amount - executed_amount, new_remaining_fee))
}

fn apply_reserved_delta<T: KvWriteTransaction>(
    tx: &mut T,
    sender: PublicKey,
    delta: &IndexMap<Asset, i64>,
) -> Result<(), MatcherError> {
    for (asset, change) in delta {
        if *change == 0 {
            continue;
        }
        let updated = reserved_get(tx, &sender, asset)? + change;
        if updated < 0 {
            return Err(MatcherError::NegativeReservedBalance {
                sender,
                asset: *asset,
                value: updated,
            });
        }
        reserved_set(tx, &sender, asset, updated)?;
    }
    Ok(())
}

fn collect_ids_newest_first(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<Vec<OrderId>, MatcherError> {
    let mut ids = entries
        .into_iter()
        .map(|(key, _)| timestamp_and_id_of_index_key("active_index", &key))
        .collect::<Result<Vec<_>, _>>()?;
    ids.sort_by(|a, b| b.cmp(a));
    Ok(ids.into_iter().map(|(_, id)| id).collect())
}
