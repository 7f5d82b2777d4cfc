// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`PlacementStrategy`] trait and strategy implementations.

pub mod greedy;
pub mod precomputed;
pub mod sequential;

use std::fmt;
use std::str::FromStr;

use crate::{Liveness, MemoryPlan, PlannerError};
use model_ir::{graph::Validated, ModelGraph};

/// Trait for placement strategies.
///
/// Each strategy takes a validated graph and its liveness analysis and
/// assigns an offset to every live transient array.
///
/// Strategies are purely algorithmic (no I/O), which keeps them easy to
/// unit-test.
pub trait PlacementStrategy: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Produces a memory plan for the given graph.
    fn place(
        &self,
        graph: &ModelGraph<Validated>,
        liveness: &Liveness,
    ) -> Result<MemoryPlan, PlannerError>;
}

/// Selects a built-in strategy by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Offsets as declared by the compiled network.
    #[default]
    Precomputed,
    /// Every array gets its own bytes.
    Sequential,
    /// Largest array first, lowest compatible offset.
    Greedy,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Precomputed,
        StrategyKind::Sequential,
        StrategyKind::Greedy,
    ];

    /// Instantiates the strategy.
    pub fn build(self) -> Box<dyn PlacementStrategy> {
        match self {
            StrategyKind::Precomputed => Box::new(precomputed::Precomputed::new()),
            StrategyKind::Sequential => Box::new(sequential::Sequential::new()),
            StrategyKind::Greedy => Box::new(greedy::GreedyBySize::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Precomputed => "precomputed",
            StrategyKind::Sequential => "sequential",
            StrategyKind::Greedy => "greedy",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "precomputed" | "compiled" => Ok(StrategyKind::Precomputed),
            "sequential" | "linear" => Ok(StrategyKind::Sequential),
            "greedy" | "greedy-by-size" | "greedy_by_size" => Ok(StrategyKind::Greedy),
            _ => Err(PlannerError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
