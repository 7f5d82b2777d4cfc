// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sequential placement strategy.
//!
//! The simplest strategy: arrays are laid out one after another in id
//! order and never share bytes. The arena is the sum of all live arrays
//! plus alignment padding.
//!
//! # When to use
//! - Debugging: every intermediate stays inspectable after a run.
//! - Baseline for measuring how much the other strategies save.

use crate::plan::{align_up, PlanBuilder};
use crate::strategy::PlacementStrategy;
use crate::{Liveness, MemoryPlan, PlannerError};
use model_ir::{graph::Validated, ModelGraph};

/// One private region per array, no reuse.
#[derive(Debug, Clone, Default)]
pub struct Sequential;

impl Sequential {
    pub fn new() -> Self {
        Self
    }
}

impl PlacementStrategy for Sequential {
    fn name(&self) -> &str {
        "sequential"
    }

    fn place(
        &self,
        graph: &ModelGraph<Validated>,
        liveness: &Liveness,
    ) -> Result<MemoryPlan, PlannerError> {
        let mut builder = PlanBuilder::new(self.name(), liveness, graph.arrays.len());
        let mut cursor = 0;
        for a in liveness.live_arrays() {
            let offset = align_up(cursor, graph.arrays[a].dtype.size_bytes());
            builder.place(a, offset);
            cursor = offset + liveness.size_bytes(a);
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::builtin;

    #[test]
    fn test_no_reuse() {
        let g = builtin::digit_classifier().validate().unwrap();
        let l = Liveness::analyze(&g);
        let plan = Sequential::new().place(&g, &l).unwrap();
        plan.validate(&g, &l).unwrap();
        // 784 + 548 + 832 + 2704 + 6144 + 704 + 800 + 2880 + 128 + 356 + 10 + 496 + 10
        assert_eq!(plan.array_bytes, 16_396);
        // Two bytes of padding align nl_7_scratch0 to 4.
        assert_eq!(plan.arena_bytes, 16_398);
        assert!(plan.reuse_factor() < 1.0);
    }
}
