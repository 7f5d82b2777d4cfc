// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mcu-rt inspect` command: display the network report, its layer chain
//! and every array of both arenas.

use std::path::PathBuf;

use anyhow::Context;
use arena_mapper::ArenaKind;
use runtime::{NetworkReport, RuntimeConfig};

pub fn execute(mut config: RuntimeConfig, model: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    super::override_paths(&mut config, model, None);
    let graph = config.load_graph().context("failed to load model")?;
    let report = NetworkReport::new(&graph);

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    super::banner("Model Inspector");
    print!("{report}");
    println!();

    // ── Layers ─────────────────────────────────────────────────
    println!(
        "  {:<4} {:<4} {:<12} {:<10} {:>10} {:>6} {:>6}",
        "Idx", "Id", "Name", "Type", "MACC", "Params", "Scratch",
    );
    println!("  {}", "-".repeat(62));
    for (i, node) in graph.chain() {
        println!(
            "  {:<4} {:<4} {:<12} {:<10} {:>10} {:>6} {:>6}",
            i,
            node.id,
            truncate(&node.name, 12),
            node.op.layer_type().as_str(),
            graph.kernel(i).macc(),
            node.params.len(),
            node.scratch.len(),
        );
    }
    println!(
        "  Estimated MACC: {} (declared {})",
        graph.estimated_macc(),
        graph.info.n_macc
    );
    println!();

    // ── Arrays ─────────────────────────────────────────────────
    for kind in [ArenaKind::Weights, ArenaKind::Activations] {
        let decl = graph.arenas.decl(kind);
        println!("  {} arena: {} B in {} buffer(s)", kind.as_str(), decl.size_bytes, decl.buffers);
        println!("  {:<38} {:<4} {:>8} {:>8} {:>8}", "Array", "Type", "Len", "Offset", "End");
        println!("  {}", "-".repeat(70));
        for (_, a) in graph.arrays_in(kind) {
            println!(
                "  {:<38} {:<4} {:>8} {:>8} {:>8}{}",
                truncate(&a.name, 38),
                a.dtype.as_str(),
                a.len,
                a.offset,
                a.end(),
                if a.io { "  (io)" } else { "" },
            );
        }
        println!();
    }
    Ok(())
}

/// Truncates a string to `max_len` with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
