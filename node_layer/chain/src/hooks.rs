//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

/// Chain event hooks. The writer reports fork events and forge timings
/// through this trait so recorders can be injected; tests observe the calls
/// deterministically and production wires a metrics implementation.
pub trait ChainHooks {
    /// The first microblock on a base block referenced something else.
    fn on_block_micro_fork(&mut self);

    /// A subsequent microblock did not reference the current tip.
    fn on_micro_micro_fork(&mut self);

    /// A forged prefix discarded `discarded_micro_blocks` microblocks.
    fn on_micro_fork(&mut self, discarded_micro_blocks: usize);

    fn on_forge_block_time(&mut self, elapsed: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChainHooks;

impl ChainHooks for NoopChainHooks {
    fn on_block_micro_fork(&mut self) {}

    fn on_micro_micro_fork(&mut self) {}

    fn on_micro_fork(&mut self, _discarded_micro_blocks: usize) {}

    fn on_forge_block_time(&mut self, _elapsed: Duration) {}
}
