// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory plan: the output of a placement strategy.
//!
//! A plan assigns a byte offset to every transient array and fixes the
//! activation arena size. It is the contract between the planner and the
//! network context: [`MemoryPlan::validate`] proves it alias-free and
//! [`MemoryPlan::apply`] writes it into a graph.

use model_ir::{graph::Validated, ModelGraph};
use tensor_core::ArrayId;
use tracing::debug;

use crate::{Liveness, PlannerError};

/// Offsets for the transient arrays of one graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MemoryPlan {
    /// Strategy name that produced this plan.
    pub strategy_name: String,
    /// Byte offset per array id; `None` for arrays the plan does not place.
    pub offsets: Vec<Option<usize>>,
    /// Activation arena size per buffer.
    pub arena_bytes: usize,
    /// Sum of the sizes of the placed arrays.
    pub array_bytes: usize,
}

impl MemoryPlan {
    /// Offset of array `a` in this plan.
    pub fn offset(&self, a: ArrayId) -> Option<usize> {
        self.offsets.get(a).copied().flatten()
    }

    /// Number of placed arrays.
    pub fn num_placed(&self) -> usize {
        self.offsets.iter().flatten().count()
    }

    /// Ratio of summed array bytes to arena bytes. Above 1.0 means reuse.
    pub fn reuse_factor(&self) -> f64 {
        if self.arena_bytes == 0 {
            return 0.0;
        }
        self.array_bytes as f64 / self.arena_bytes as f64
    }

    /// Validates the plan against a graph.
    ///
    /// Checks:
    /// - Every live transient array is placed, aligned to its element size,
    ///   and ends inside the arena.
    /// - No two arrays that are live at the same step share bytes, except a
    ///   conv + pool input and output whose row streaming is safe.
    pub fn validate(&self, graph: &ModelGraph<Validated>, liveness: &Liveness) -> Result<(), PlannerError> {
        if self.offsets.len() != graph.arrays.len() {
            return Err(self.failed(format!(
                "plan covers {} arrays, graph has {}",
                self.offsets.len(),
                graph.arrays.len()
            )));
        }

        let live: Vec<ArrayId> = liveness.live_arrays().collect();
        for &a in &live {
            let def = &graph.arrays[a];
            let offset = self
                .offset(a)
                .ok_or_else(|| self.failed(format!("array '{}' is not placed", def.name)))?;
            let align = def.dtype.size_bytes();
            if offset % align != 0 {
                return Err(PlannerError::Misaligned {
                    array: def.name.clone(),
                    offset,
                    align,
                });
            }
            let end = offset + def.size_bytes();
            if end > self.arena_bytes {
                return Err(PlannerError::ExceedsArena {
                    array: def.name.clone(),
                    end,
                    size: self.arena_bytes,
                });
            }
        }

        for (i, &a) in live.iter().enumerate() {
            for &b in &live[i + 1..] {
                let (oa, ob) = (self.offset(a).unwrap_or(0), self.offset(b).unwrap_or(0));
                if !liveness.compatible(a, oa, b, ob) {
                    let (da, db) = (&graph.arrays[a], &graph.arrays[b]);
                    return Err(PlannerError::Aliasing {
                        first: da.name.clone(),
                        second: db.name.clone(),
                        detail: format!(
                            "[{oa}, {}) and [{ob}, {}) are live together",
                            oa + da.size_bytes(),
                            ob + db.size_bytes()
                        ),
                    });
                }
            }
        }
        debug!("plan '{}' verified: {} arrays", self.strategy_name, live.len());
        Ok(())
    }

    /// Writes the planned offsets and arena size into `graph` and validates
    /// the result.
    pub fn apply(&self, graph: ModelGraph<Validated>) -> Result<ModelGraph<Validated>, PlannerError> {
        if self.offsets.len() != graph.arrays.len() {
            return Err(self.failed("plan was made for a different graph".into()));
        }
        let mut g = graph.into_loaded();
        for (a, array) in g.arrays.iter_mut().enumerate() {
            if let Some(offset) = self.offset(a) {
                array.offset = offset;
            }
        }
        g.arenas.activations.size_bytes = self.arena_bytes;
        Ok(g.validate()?)
    }

    /// Fails when the arena exceeds `budget` bytes.
    pub fn check_budget(&self, budget: usize) -> Result<(), PlannerError> {
        if self.arena_bytes > budget {
            return Err(PlannerError::BudgetExceeded {
                strategy: self.strategy_name.clone(),
                required: self.arena_bytes,
                budget,
            });
        }
        Ok(())
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        format!(
            "Plan '{}': {} arrays in {} B (sum {} B, reuse {:.2}x)",
            self.strategy_name,
            self.num_placed(),
            self.arena_bytes,
            self.array_bytes,
            self.reuse_factor(),
        )
    }

    fn failed(&self, detail: String) -> PlannerError {
        PlannerError::StrategyFailed {
            strategy: self.strategy_name.clone(),
            detail,
        }
    }
}

/// Builder helper for constructing a `MemoryPlan` incrementally.
///
/// Used internally by strategy implementations.
pub(crate) struct PlanBuilder<'a> {
    strategy_name: String,
    liveness: &'a Liveness,
    offsets: Vec<Option<usize>>,
    arena_bytes: usize,
    array_bytes: usize,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(strategy_name: &str, liveness: &'a Liveness, num_arrays: usize) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            liveness,
            offsets: vec![None; num_arrays],
            arena_bytes: 0,
            array_bytes: 0,
        }
    }

    /// Places array `a` at `offset`.
    pub fn place(&mut self, a: ArrayId, offset: usize) {
        let size = self.liveness.size_bytes(a);
        self.offsets[a] = Some(offset);
        self.arena_bytes = self.arena_bytes.max(offset + size);
        self.array_bytes += size;
    }

    /// Arrays placed so far with their offsets.
    pub fn placed(&self) -> impl Iterator<Item = (ArrayId, usize)> + '_ {
        self.offsets
            .iter()
            .enumerate()
            .filter_map(|(a, o)| o.map(|o| (a, o)))
    }

    /// Overrides the arena size, e.g. to keep a declared size.
    pub fn with_arena_bytes(mut self, bytes: usize) -> Self {
        self.arena_bytes = self.arena_bytes.max(bytes);
        self
    }

    /// Consumes the builder and returns the finished plan.
    pub fn build(self) -> MemoryPlan {
        MemoryPlan {
            strategy_name: self.strategy_name,
            offsets: self.offsets,
            arena_bytes: self.arena_bytes,
            array_bytes: self.array_bytes,
        }
    }
}

/// Rounds `offset` up to a multiple of `align`.
pub(crate) fn align_up(offset: usize, align: usize) -> usize {
    offset.next_multiple_of(align.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::builtin;

    fn setup() -> (ModelGraph<Validated>, Liveness) {
        let g = builtin::digit_classifier().validate().unwrap();
        let l = Liveness::analyze(&g);
        (g, l)
    }

    fn compiled_plan(g: &ModelGraph<Validated>, l: &Liveness) -> MemoryPlan {
        let mut b = PlanBuilder::new("compiled", l, g.arrays.len());
        for a in l.live_arrays() {
            b.place(a, g.arrays[a].offset);
        }
        b.build()
    }

    #[test]
    fn test_compiled_layout_is_alias_free() {
        let (g, l) = setup();
        let plan = compiled_plan(&g, &l);
        assert_eq!(plan.arena_bytes, 9_712);
        assert_eq!(plan.num_placed(), 13);
        plan.validate(&g, &l).unwrap();
        assert!(plan.reuse_factor() > 1.0);
    }

    #[test]
    fn test_aliasing_reported_with_names() {
        let (g, l) = setup();
        let mut plan = compiled_plan(&g, &l);
        let g6 = g.arrays.iter().position(|a| a.name == "gemm_6_output").unwrap();
        plan.offsets[g6] = Some(3_680);
        match plan.validate(&g, &l) {
            Err(PlannerError::Aliasing { first, second, .. }) => {
                let names = [first.as_str(), second.as_str()];
                assert!(names.contains(&"gemm_5_output") && names.contains(&"gemm_6_output"));
            }
            other => panic!("expected aliasing, got {other:?}"),
        }
    }

    #[test]
    fn test_misaligned() {
        let (g, l) = setup();
        let mut plan = compiled_plan(&g, &l);
        let s = g.arrays.iter().position(|a| a.name == "nl_7_scratch0").unwrap();
        plan.offsets[s] = Some(370);
        assert!(matches!(plan.validate(&g, &l), Err(PlannerError::Misaligned { align: 4, .. })));
    }

    #[test]
    fn test_apply_rewrites_offsets() {
        let (g, l) = setup();
        let mut plan = compiled_plan(&g, &l);
        let out = g.arrays.iter().position(|a| a.name == "nl_7_output").unwrap();
        plan.offsets[out] = Some(9_712);
        plan.arena_bytes = 9_722;
        let g2 = plan.apply(g).unwrap();
        assert_eq!(g2.arrays[out].offset, 9_712);
        assert_eq!(g2.arenas.activations.size_bytes, 9_722);
    }

    #[test]
    fn test_budget() {
        let (g, l) = setup();
        let plan = compiled_plan(&g, &l);
        assert!(plan.check_budget(16 * 1024).is_ok());
        assert!(matches!(
            plan.check_budget(8 * 1024),
            Err(PlannerError::BudgetExceeded { required: 9_712, .. })
        ));
        assert!(plan.summary().contains("13 arrays in 9712 B"));
    }
}
