// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/digits"        # omit for the built-in network
//! weights_path = "./models/digits/model.bin"
//! synthetic_seed = 7
//! batches = 1
//! placement_strategy = "precomputed"
//! verify_placement = true
//! enable_profiling = false
//! ```

use std::path::{Path, PathBuf};

use arena_planner::StrategyKind;
use model_ir::{graph::Validated, ModelGraph, ModelLoader};

use crate::{NetworkParams, RuntimeError};

/// Configuration for the inference runtime.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Model directory or manifest; the built-in network when absent.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Weights blob (`.bin` or `.safetensors`); synthetic weights when absent.
    #[serde(default)]
    pub weights_path: Option<PathBuf>,
    /// Seed for synthetic weights; `None` gives an all-zero blob.
    #[serde(default)]
    pub synthetic_seed: Option<u64>,
    /// Batches per run. Must match the compiled network.
    #[serde(default = "default_batches")]
    pub batches: usize,
    /// How activation offsets are placed before binding.
    #[serde(default)]
    pub placement_strategy: StrategyKind,
    /// Verify the activation layout for aliasing at create time.
    #[serde(default = "default_true")]
    pub verify_placement: bool,
    /// Whether to collect per-layer profiling metrics.
    #[serde(default)]
    pub enable_profiling: bool,
}

fn default_true() -> bool {
    true
}

fn default_batches() -> usize {
    1
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.batches == 0 {
            return Err(RuntimeError::Config("batches must be at least 1".into()));
        }
        Ok(())
    }

    /// Loads the configured model, re-placing activations when a strategy
    /// other than the compiled layout is selected.
    pub fn load_graph(&self) -> Result<ModelGraph<Validated>, RuntimeError> {
        let graph = ModelLoader::load_or_builtin(self.model_path.as_deref())?;
        if self.placement_strategy == StrategyKind::Precomputed {
            return Ok(graph);
        }
        let plan = arena_planner::plan_with(&graph, self.placement_strategy)?;
        tracing::info!("re-placed activations: {}", plan.summary());
        Ok(plan.apply(graph)?)
    }

    /// Creation parameters for a network with one buffer per arena.
    pub fn network_params(&self) -> NetworkParams {
        NetworkParams {
            batches: self.batches,
            verify_placement: self.verify_placement,
            enable_profiling: self.enable_profiling,
            ..NetworkParams::default()
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            weights_path: None,
            synthetic_seed: None,
            batches: 1,
            placement_strategy: StrategyKind::Precomputed,
            verify_placement: true,
            enable_profiling: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert!(c.model_path.is_none());
        assert_eq!(c.batches, 1);
        assert_eq!(c.placement_strategy, StrategyKind::Precomputed);
        assert!(c.verify_placement);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
model_path = "/tmp/digits"
synthetic_seed = 42
placement_strategy = "greedy"
enable_profiling = true
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.model_path, Some(PathBuf::from("/tmp/digits")));
        assert_eq!(c.synthetic_seed, Some(42));
        assert_eq!(c.placement_strategy, StrategyKind::Greedy);
        assert!(c.enable_profiling);
        assert!(c.verify_placement);
        assert_eq!(c.batches, 1);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RuntimeConfig::from_toml("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(RuntimeConfig::from_toml("batches = 0").is_err());
        assert!(RuntimeConfig::from_toml("placement_strategy = \"best-fit\"").is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            weights_path: Some(PathBuf::from("model.bin")),
            enable_profiling: true,
            ..Default::default()
        };
        let back = RuntimeConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_network_params() {
        let c = RuntimeConfig {
            enable_profiling: true,
            ..Default::default()
        };
        let p = c.network_params();
        assert_eq!((p.weights_buffers, p.activations_buffers, p.batches), (1, 1, 1));
        assert!(p.enable_profiling);
    }

    #[test]
    fn test_load_graph_replaces_activations() {
        let compiled = RuntimeConfig::default().load_graph().unwrap();
        assert_eq!(compiled.arenas.activations.size_bytes, 9_712);

        let c = RuntimeConfig {
            placement_strategy: StrategyKind::Sequential,
            ..Default::default()
        };
        let g = c.load_graph().unwrap();
        assert_eq!(g.arenas.activations.size_bytes, 16_398);
    }
}
