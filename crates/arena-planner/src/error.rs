// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the arena planner.

/// Errors that can occur during placement or plan verification.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Two arrays that are live at the same time share bytes.
    #[error("arrays '{first}' and '{second}' alias: {detail}")]
    Aliasing {
        first: String,
        second: String,
        detail: String,
    },

    /// An array offset is not a multiple of its element size.
    #[error("array '{array}' at offset {offset} is not aligned to {align} bytes")]
    Misaligned {
        array: String,
        offset: usize,
        align: usize,
    },

    /// An array ends past the planned arena size.
    #[error("array '{array}' ends at {end}, past the {size}-byte arena")]
    ExceedsArena {
        array: String,
        end: usize,
        size: usize,
    },

    /// The plan needs more activation memory than the budget allows.
    #[error("plan '{strategy}' needs {required} bytes, budget is {budget}")]
    BudgetExceeded {
        strategy: String,
        required: usize,
        budget: usize,
    },

    /// The plan does not match the graph it is applied to.
    #[error("strategy '{strategy}' failed: {detail}")]
    StrategyFailed { strategy: String, detail: String },

    /// The strategy name is not recognised.
    #[error("unknown placement strategy '{0}' (expected precomputed, sequential or greedy)")]
    UnknownStrategy(String),

    /// Revalidating a rewritten graph failed.
    #[error("rewritten graph is invalid: {0}")]
    Model(#[from] model_ir::ModelError),
}
