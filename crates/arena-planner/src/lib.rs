// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # arena-planner
//!
//! Computes when each transient array of a validated `ModelGraph` is live
//! and assigns activation-arena offsets so that arrays live at the same
//! step never share bytes.
//!
//! # Strategies
//!
//! | Strategy | Arena size | Reuse | Use |
//! |---|---|---|---|
//! | [`Precomputed`] | As compiled | As compiled | Verifying a shipped layout |
//! | [`Sequential`] | Sum of arrays | None | Debugging, baseline |
//! | [`GreedyBySize`] | Smallest found | Lifetimes + row streaming | Re-planning a manifest |
//!
//! # Row streaming
//!
//! A conv + pool layer emits its output one pooled row at a time. Its
//! input and output may overlap when no emitted row reaches input bytes
//! that a later row still reads; see [`streaming_safe`].
//!
//! # Trait-Based Extensibility
//!
//! All strategies implement [`PlacementStrategy`]:
//!
//! ```ignore
//! struct MyStrategy;
//! impl PlacementStrategy for MyStrategy {
//!     fn name(&self) -> &str { "mine" }
//!     fn place(&self, graph: &ModelGraph<Validated>, liveness: &Liveness)
//!         -> Result<MemoryPlan, PlannerError> { /* ... */ }
//! }
//! ```
//!
//! # Example
//! ```no_run
//! use arena_planner::{GreedyBySize, Liveness, PlacementStrategy};
//! use model_ir::ModelLoader;
//!
//! let graph = ModelLoader::builtin().unwrap();
//! let liveness = Liveness::analyze(&graph);
//! let plan = GreedyBySize::new().place(&graph, &liveness).unwrap();
//! plan.validate(&graph, &liveness).unwrap();
//! println!("{}", plan.summary());
//! ```

mod error;
pub mod liveness;
pub(crate) mod plan;
pub mod strategy;

pub use error::PlannerError;
pub use liveness::{streaming_safe, Lifetime, Liveness, StreamPair};
pub use plan::MemoryPlan;
pub use strategy::greedy::GreedyBySize;
pub use strategy::precomputed::Precomputed;
pub use strategy::sequential::Sequential;
pub use strategy::{PlacementStrategy, StrategyKind};

use model_ir::{graph::Validated, ModelGraph};

/// Runs `kind` and verifies the resulting plan.
pub fn plan_with(
    graph: &ModelGraph<Validated>,
    kind: StrategyKind,
) -> Result<MemoryPlan, PlannerError> {
    let liveness = Liveness::analyze(graph);
    let plan = kind.build().place(graph, &liveness)?;
    plan.validate(graph, &liveness)?;
    tracing::debug!("{}", plan.summary());
    Ok(plan)
}

/// Runs every built-in strategy and returns the smallest valid plan.
///
/// Ties go to the earlier strategy in [`StrategyKind::ALL`], so a compiled
/// layout is kept unless another strategy strictly beats it.
pub fn best_plan(graph: &ModelGraph<Validated>) -> Result<MemoryPlan, PlannerError> {
    let liveness = Liveness::analyze(graph);
    let mut best: Option<MemoryPlan> = None;
    for kind in StrategyKind::ALL {
        let plan = match kind.build().place(graph, &liveness) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("strategy '{kind}' failed: {e}");
                continue;
            }
        };
        if let Err(e) = plan.validate(graph, &liveness) {
            tracing::warn!("strategy '{kind}' produced an invalid plan: {e}");
            continue;
        }
        if best.as_ref().is_none_or(|b| plan.arena_bytes < b.arena_bytes) {
            best = Some(plan);
        }
    }
    let best = best.ok_or_else(|| PlannerError::StrategyFailed {
        strategy: "best".into(),
        detail: "no strategy produced a valid plan".into(),
    })?;
    tracing::info!("best plan → {}", best.summary());
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::builtin;

    #[test]
    fn test_every_strategy_valid_on_builtin() {
        let g = builtin::digit_classifier().validate().unwrap();
        for kind in StrategyKind::ALL {
            let plan = plan_with(&g, kind).unwrap();
            assert_eq!(plan.strategy_name, kind.as_str());
            assert_eq!(plan.num_placed(), 13);
        }
    }

    #[test]
    fn test_best_plan_never_exceeds_compiled() {
        let g = builtin::digit_classifier().validate().unwrap();
        let best = best_plan(&g).unwrap();
        assert!(best.arena_bytes <= 9_712);
        let applied = best.apply(g).unwrap();
        assert_eq!(applied.arenas.activations.size_bytes, best.arena_bytes);
    }
}
