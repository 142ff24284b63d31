//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use flux_common_types::{Asset, OrderId, PublicKey};
use flux_storage::{deserialize_json, serialize_json, KvReadTransaction, KvWriteTransaction, Map, StorageError};

use crate::models::{Order, OrderInfo, OrderSide, OrderStatus};

pub(crate) const MAP_ORDER_INFO: Map = Map("order_info");
pub(crate) const MAP_ORDER_META: Map = Map("order_meta");
pub(crate) const MAP_RESERVED: Map = Map("reserved");
pub(crate) const MAP_ACTIVE_INDEX: Map = Map("active_index");
pub(crate) const MAP_ALL_INDEX: Map = Map("all_index");

// Composite keys use fixed-width segments so timestamps and ids parse at
// constant offsets: sender(32) ‖ [assets(33+33) ‖ side(1)] ‖ timestamp(8,
// big-endian) ‖ order id(32).

pub(crate) fn reserved_key(sender: &PublicKey, asset: &Asset) -> Vec<u8> {
    let mut key = Vec::with_capacity(PublicKey::BYTE_SIZE + Asset::KEY_BYTE_SIZE);
    key.extend_from_slice(sender.as_bytes());
    key.extend_from_slice(&asset.key_bytes());
    key
}

pub(crate) fn asset_of_reserved_key(key: &[u8]) -> Result<Asset, StorageError> {
    let tail = key
        .get(PublicKey::BYTE_SIZE..)
        .ok_or_else(|| malformed_key("reserved", key))?;
    Asset::from_key_bytes(tail).map_err(|_| malformed_key("reserved", key))
}

pub(crate) fn active_index_key(order: &Order) -> Vec<u8> {
    let mut key = active_pair_prefix(&order.sender, &order.pair.amount_asset, &order.pair.price_asset);
    key.push(match order.side {
        OrderSide::Buy => 0,
        OrderSide::Sell => 1,
    });
    key.extend_from_slice(&(order.timestamp as u64).to_be_bytes());
    key.extend_from_slice(order.id.as_bytes());
    key
}

pub(crate) fn active_prefix(sender: &PublicKey) -> Vec<u8> {
    sender.as_bytes().to_vec()
}

pub(crate) fn active_pair_prefix(sender: &PublicKey, amount_asset: &Asset, price_asset: &Asset) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(PublicKey::BYTE_SIZE + 2 * Asset::KEY_BYTE_SIZE + 1 + 8 + OrderId::BYTE_SIZE);
    prefix.extend_from_slice(sender.as_bytes());
    prefix.extend_from_slice(&amount_asset.key_bytes());
    prefix.extend_from_slice(&price_asset.key_bytes());
    prefix
}

pub(crate) fn all_index_key(sender: &PublicKey, timestamp: i64, id: &OrderId) -> Vec<u8> {
    let mut key = Vec::with_capacity(PublicKey::BYTE_SIZE + 8 + OrderId::BYTE_SIZE);
    key.extend_from_slice(sender.as_bytes());
    key.extend_from_slice(&(timestamp as u64).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Both index keys end in `timestamp ‖ order id`.
pub(crate) fn timestamp_and_id_of_index_key(item: &'static str, key: &[u8]) -> Result<(i64, OrderId), StorageError> {
    if key.len() < 8 + OrderId::BYTE_SIZE {
        return Err(malformed_key(item, key));
    }
    let ts_start = key.len() - 8 - OrderId::BYTE_SIZE;
    let ts_bytes: [u8; 8] = key[ts_start..ts_start + 8]
        .try_into()
        .map_err(|_| malformed_key(item, key))?;
    let id = OrderId::try_from(&key[ts_start + 8..]).map_err(|_| malformed_key(item, key))?;
    Ok((u64::from_be_bytes(ts_bytes) as i64, id))
}

fn malformed_key(item: &'static str, key: &[u8]) -> StorageError {
    StorageError::DecodeError {
        item,
        details: format!("malformed index key {}", hex::encode(key)),
    }
}

pub(crate) fn order_info_get<T: KvReadTransaction>(tx: &T, id: &OrderId) -> Result<OrderInfo, StorageError> {
    let bytes = tx
        .get(MAP_ORDER_INFO, id.as_bytes())?
        .ok_or_else(|| StorageError::not_found("order info", id.as_bytes()))?;
    deserialize_json("order info", &bytes)
}

pub(crate) fn order_info_put<T: KvWriteTransaction>(tx: &mut T, id: &OrderId, info: &OrderInfo) -> Result<(), StorageError> {
    tx.put(MAP_ORDER_INFO, id.to_vec(), serialize_json("order info", info)?)
}

pub(crate) fn order_meta_get<T: KvReadTransaction>(tx: &T, id: &OrderId) -> Result<Order, StorageError> {
    let bytes = tx
        .get(MAP_ORDER_META, id.as_bytes())?
        .ok_or_else(|| StorageError::not_found("order", id.as_bytes()))?;
    deserialize_json("order", &bytes)
}

pub(crate) fn order_meta_put<T: KvWriteTransaction>(tx: &mut T, order: &Order) -> Result<(), StorageError> {
    tx.put(MAP_ORDER_META, order.id.to_vec(), serialize_json("order", order)?)
}

pub(crate) fn reserved_get<T: KvReadTransaction>(tx: &T, sender: &PublicKey, asset: &Asset) -> Result<i64, StorageError> {
    let Some(bytes) = tx.get(MAP_RESERVED, &reserved_key(sender, asset))? else {
        return Ok(0);
    };
    deserialize_json("reserved balance", &bytes)
}

pub(crate) fn reserved_set<T: KvWriteTransaction>(
    tx: &mut T,
    sender: &PublicKey,
    asset: &Asset,
    value: i64,
) -> Result<(), StorageError> {
    let key = reserved_key(sender, asset);
    if value == 0 {
        tx.delete(MAP_RESERVED, &key)
    } else {
        tx.put(MAP_RESERVED, key, serialize_json("reserved balance", &value)?)
    }
}

pub(crate) fn status_snapshot_put<T: KvWriteTransaction>(
    tx: &mut T,
    order: &Order,
    status: &OrderStatus,
) -> Result<(), StorageError> {
    tx.put(
        MAP_ALL_INDEX,
        all_index_key(&order.sender, order.timestamp, &order.id),
        serialize_json("order status", status)?,
    )
}
