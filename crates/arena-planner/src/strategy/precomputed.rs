// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Precomputed placement: the offsets the compiler emitted.
//!
//! Nothing is computed; the plan restates the graph's own offsets and
//! declared arena size so they can be verified like any other plan.

use crate::plan::PlanBuilder;
use crate::strategy::PlacementStrategy;
use crate::{Liveness, MemoryPlan, PlannerError};
use model_ir::{graph::Validated, ModelGraph};

/// Keeps the offsets stored in the graph.
#[derive(Debug, Clone, Default)]
pub struct Precomputed;

impl Precomputed {
    pub fn new() -> Self {
        Self
    }
}

impl PlacementStrategy for Precomputed {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn place(
        &self,
        graph: &ModelGraph<Validated>,
        liveness: &Liveness,
    ) -> Result<MemoryPlan, PlannerError> {
        let mut builder = PlanBuilder::new(self.name(), liveness, graph.arrays.len());
        for a in liveness.live_arrays() {
            builder.place(a, graph.arrays[a].offset);
        }
        Ok(builder
            .with_arena_bytes(graph.arenas.activations.size_bytes)
            .build())
    }
}
