// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommands and the helpers they share.

pub mod benchmark;
pub mod inspect;
pub mod plan;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::Context;
use runtime::RuntimeConfig;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the TOML configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(p) => {
            let config = RuntimeConfig::from_file(p)
                .with_context(|| format!("failed to load config '{}'", p.display()))?;
            tracing::info!("loaded config from {}", p.display());
            Ok(config)
        }
        None => Ok(RuntimeConfig::default()),
    }
}

/// Applies command-line paths on top of the configuration.
pub fn override_paths(config: &mut RuntimeConfig, model: Option<PathBuf>, weights: Option<PathBuf>) {
    if model.is_some() {
        config.model_path = model;
    }
    if weights.is_some() {
        config.weights_path = weights;
    }
}

pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ {:^52} ║", format!("mcu-rt · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}
