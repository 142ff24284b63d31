//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

mod error;
pub use error::StorageError;

mod memory;
pub use memory::MemoryKvStore;

mod serialization;
pub use serialization::{deserialize_json, serialize_json};

mod store;
pub use store::{KeyValueStore, KvReadTransaction, KvWriteTransaction, Map};
