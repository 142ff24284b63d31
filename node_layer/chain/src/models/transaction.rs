//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

use flux_common_types::TxId;

/// A transaction as carried by blocks and microblocks. Parsing and
/// signature checks happen in the transaction collaborator; the chain layer
/// only moves the bytes around and returns them to the mempool on discard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TxId,
    body: Vec<u8>,
}

impl Transaction {
    pub fn new(id: TxId, body: Vec<u8>) -> Self {
        Self { id, body }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
