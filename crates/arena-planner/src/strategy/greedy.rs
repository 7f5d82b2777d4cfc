// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Greedy-by-size placement strategy.
//!
//! Places arrays from largest to smallest. Each array goes to the lowest
//! aligned offset compatible with every array already placed: either the
//! lifetimes are disjoint, the byte ranges are disjoint, or the pair is a
//! conv + pool input/output that streams safely at those offsets.
//!
//! Candidate offsets are zero and the end of each placed array, so the
//! search is quadratic in the number of arrays. Networks for this runtime
//! have tens of arrays.

use crate::plan::{align_up, PlanBuilder};
use crate::strategy::PlacementStrategy;
use crate::{Liveness, MemoryPlan, PlannerError};
use model_ir::{graph::Validated, ModelGraph};
use tensor_core::ArrayId;

/// Largest-first, lowest-compatible-offset placement.
#[derive(Debug, Clone, Default)]
pub struct GreedyBySize;

impl GreedyBySize {
    pub fn new() -> Self {
        Self
    }
}

impl PlacementStrategy for GreedyBySize {
    fn name(&self) -> &str {
        "greedy"
    }

    fn place(
        &self,
        graph: &ModelGraph<Validated>,
        liveness: &Liveness,
    ) -> Result<MemoryPlan, PlannerError> {
        let mut order: Vec<ArrayId> = liveness.live_arrays().collect();
        order.sort_by(|&a, &b| liveness.size_bytes(b).cmp(&liveness.size_bytes(a)).then(a.cmp(&b)));

        let mut builder = PlanBuilder::new(self.name(), liveness, graph.arrays.len());
        for a in order {
            let align = graph.arrays[a].dtype.size_bytes();
            let placed: Vec<(ArrayId, usize)> = builder.placed().collect();

            let mut candidates: Vec<usize> = std::iter::once(0)
                .chain(placed.iter().map(|&(p, off)| off + liveness.size_bytes(p)))
                .map(|off| align_up(off, align))
                .collect();
            candidates.sort_unstable();
            candidates.dedup();

            let offset = candidates
                .into_iter()
                .find(|&off| placed.iter().all(|&(p, poff)| liveness.compatible(a, off, p, poff)))
                .ok_or_else(|| PlannerError::StrategyFailed {
                    strategy: self.name().to_string(),
                    detail: format!("no offset found for '{}'", graph.arrays[a].name),
                })?;
            builder.place(a, offset);
        }
        Ok(builder.build())
    }
}
