// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mcu-rt plan` command: place activations and check them against a RAM
//! budget.
//!
//! With `--strategy` it prints one plan array by array; without it, every
//! strategy side by side.

use std::path::PathBuf;

use anyhow::Context;
use arena_mapper::{ArenaKind, ByteSize};
use arena_planner::{plan_with, Liveness, MemoryPlan, StrategyKind};
use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use runtime::RuntimeConfig;

pub fn execute(
    mut config: RuntimeConfig,
    model: Option<PathBuf>,
    strategy: Option<String>,
    ram_budget: Option<String>,
) -> anyhow::Result<()> {
    super::banner("Activation Planner");
    super::override_paths(&mut config, model, None);

    // Plans are computed against the compiled layout, not a re-placed one.
    let graph = ModelLoader::load_or_builtin(config.model_path.as_deref())
        .context("failed to load model")?;
    let budget = ram_budget
        .as_deref()
        .map(ByteSize::parse)
        .transpose()
        .context("invalid --ram-budget")?;

    println!("  Model:  {}", graph.summary());
    if let Some(b) = budget {
        println!("  Budget: {b}");
    }
    println!();

    match strategy {
        Some(name) => {
            let kind: StrategyKind = name.parse()?;
            let plan = plan_with(&graph, kind)?;
            print_plan(&graph, &plan);
            if let Some(b) = budget {
                plan.check_budget(b.as_bytes())?;
                println!("  Fits in {b}.");
            }
        }
        None => compare(&graph, budget),
    }
    Ok(())
}

fn print_plan(graph: &ModelGraph<Validated>, plan: &MemoryPlan) {
    let liveness = Liveness::analyze(graph);
    println!("  {}", plan.summary());
    println!();
    println!(
        "  {:<38} {:>6} {:>8} {:>8} {:>9}",
        "Array", "Bytes", "Offset", "End", "Live"
    );
    println!("  {}", "-".repeat(74));
    for (id, a) in graph.arrays_in(ArenaKind::Activations) {
        let (Some(off), Some(life)) = (plan.offset(id), liveness.lifetime(id)) else {
            continue;
        };
        println!(
            "  {:<38} {:>6} {:>8} {:>8} {:>4}..{:<3}",
            a.name,
            a.size_bytes(),
            off,
            off + a.size_bytes(),
            life.first,
            life.last,
        );
    }
    println!();
}

fn compare(graph: &ModelGraph<Validated>, budget: Option<ByteSize>) {
    println!(
        "  {:<14} {:>10} {:>10} {:>8} {:>8}",
        "Strategy", "Arena B", "Arrays B", "Reuse", "Fits"
    );
    println!("  {}", "-".repeat(56));
    for kind in StrategyKind::ALL {
        match plan_with(graph, kind) {
            Ok(plan) => {
                let fits = match budget {
                    Some(b) if plan.check_budget(b.as_bytes()).is_err() => "no",
                    Some(_) => "yes",
                    None => "-",
                };
                println!(
                    "  {:<14} {:>10} {:>10} {:>7.2}x {:>8}",
                    kind.as_str(),
                    plan.arena_bytes,
                    plan.array_bytes,
                    plan.reuse_factor(),
                    fits,
                );
            }
            Err(e) => println!("  {:<14} FAILED: {e}", kind.as_str()),
        }
    }
    println!();
}
