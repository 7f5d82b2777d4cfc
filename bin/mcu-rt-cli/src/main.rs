// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # mcu-rt
//!
//! Command-line host for the quantized CNN runtime.
//!
//! ## Usage
//! ```bash
//! # Classify a 28x28 grayscale image
//! mcu-rt run --image digit.pgm --weights model.bin
//!
//! # Show the network, its arenas and I/O
//! mcu-rt inspect --json
//!
//! # Re-place activations and check them against a RAM budget
//! mcu-rt plan --strategy greedy --ram-budget 16K
//!
//! # Time repeated inferences
//! mcu-rt benchmark --iterations 1000
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mcu-rt",
    about = "Quantized CNN inference inside host-owned memory arenas",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file; CLI arguments override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one image.
    Run {
        /// Raw 784-byte image or binary PGM (P5).
        #[arg(short, long)]
        image: PathBuf,

        /// Weights blob (.bin or .safetensors).
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Model directory or manifest; the built-in network when absent.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Treat raw image bytes as already-centred int8.
        #[arg(long)]
        signed: bool,
    },

    /// Print the network report, layers and arrays.
    Inspect {
        /// Model directory or manifest; the built-in network when absent.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compute activation placements and compare strategies.
    Plan {
        /// Model directory or manifest; the built-in network when absent.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// precomputed, sequential or greedy; all of them when absent.
        #[arg(short, long)]
        strategy: Option<String>,

        /// RAM available for activations (e.g. "9712", "16K").
        #[arg(long)]
        ram_budget: Option<String>,
    },

    /// Time repeated inferences.
    Benchmark {
        /// Number of timed runs.
        #[arg(short = 'n', long, default_value_t = 100)]
        iterations: usize,

        /// Weights blob; synthetic weights when absent.
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Model directory or manifest; the built-in network when absent.
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            image,
            weights,
            model,
            signed,
        } => commands::run::execute(config, image, weights, model, signed),
        Commands::Inspect { model, json } => commands::inspect::execute(config, model, json),
        Commands::Plan {
            model,
            strategy,
            ram_budget,
        } => commands::plan::execute(config, model, strategy, ram_budget),
        Commands::Benchmark {
            iterations,
            weights,
            model,
        } => commands::benchmark::execute(config, iterations, weights, model),
    }
}
