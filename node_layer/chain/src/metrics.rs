//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

use prometheus::{core::Collector, Histogram, HistogramOpts, IntCounter, Registry};

use crate::ChainHooks;

/// Prometheus-backed implementation of [`ChainHooks`].
#[derive(Debug, Clone)]
pub struct PrometheusChainMetrics {
    block_micro_fork: IntCounter,
    micro_micro_fork: IntCounter,
    microblock_fork: IntCounter,
    microblock_fork_height: Histogram,
    forge_block_time: Histogram,
}

impl PrometheusChainMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            block_micro_fork: register(
                registry,
                IntCounter::new(
                    "chain_block_micro_fork",
                    "Number of microblocks that did not reference their base block",
                )
                .unwrap(),
            ),
            micro_micro_fork: register(
                registry,
                IntCounter::new(
                    "chain_micro_micro_fork",
                    "Number of microblocks that did not reference the liquid tip",
                )
                .unwrap(),
            ),
            microblock_fork: register(
                registry,
                IntCounter::new("chain_microblock_fork", "Number of forged prefixes that discarded microblocks")
                    .unwrap(),
            ),
            microblock_fork_height: register(
                registry,
                Histogram::with_opts(HistogramOpts::new(
                    "chain_microblock_fork_height",
                    "Number of microblocks discarded per fork",
                ))
                .unwrap(),
            ),
            forge_block_time: register(
                registry,
                Histogram::with_opts(HistogramOpts::new(
                    "chain_forge_block_time",
                    "Time in milliseconds spent forging a block from the liquid prefix",
                ))
                .unwrap(),
            ),
        }
    }
}

fn register<T: Collector + Clone + 'static>(registry: &Registry, collector: T) -> T {
    registry.register(Box::new(collector.clone())).unwrap();
    collector
}

impl ChainHooks for PrometheusChainMetrics {
    fn on_block_micro_fork(&mut self) {
        self.block_micro_fork.inc();
    }

    fn on_micro_micro_fork(&mut self) {
        self.micro_micro_fork.inc();
    }

    fn on_micro_fork(&mut self, discarded_micro_blocks: usize) {
        self.microblock_fork.inc();
        self.microblock_fork_height.observe(discarded_micro_blocks as f64);
    }

    fn on_forge_block_time(&mut self, elapsed: Duration) {
        self.forge_block_time.observe(elapsed.as_secs_f64() * 1000.0);
    }
}
