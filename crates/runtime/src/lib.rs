// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Runs a validated `ModelGraph` inside two host-owned arenas.
//!
//! The runtime takes:
//! - A validated `ModelGraph` from `model-ir`.
//! - A read-only weights buffer, from [`WeightLoader`] or the host.
//! - A writable activations buffer sized to the declared arena.
//!
//! And executes the chain node by node, with every intermediate living at
//! its precomputed arena offset.
//!
//! # Lifecycle
//! ```text
//! create ──► Created ── init ──► Ready ── run / forward ──► Ready
//!                                  │
//!                                  └── destroy ──► ModelGraph
//! ```
//! Each failing call records a [`NetworkError`] retrievable with
//! [`NetworkContext::get_error`].
//!
//! # Concurrency
//! Single-threaded. `run` takes `&mut self`, so one context cannot be run
//! twice at once, and nothing is allocated during a run unless profiling is
//! enabled.
//!
//! # Example
//! ```no_run
//! use runtime::{classify, NetworkContext, RuntimeConfig, WeightLoader};
//!
//! let config = RuntimeConfig::default();
//! let graph = config.load_graph().unwrap();
//! let weights = WeightLoader::from_config(&config, &graph).unwrap();
//! let mut activations = vec![0u8; graph.arenas.activations.size_bytes];
//!
//! let params = config.network_params();
//! let mut ctx = NetworkContext::create_and_init(
//!     graph,
//!     params,
//!     vec![&weights[..]],
//!     vec![&mut activations[..]],
//! )
//! .unwrap();
//! let result = classify(&mut ctx, &[0u8; 784]).unwrap();
//! println!("{result}");
//! ```

mod classify;
mod config;
mod context;
mod engine;
mod error;
mod metrics;
mod report;
mod weight_loader;
mod workspace;

pub use classify::{classify, recenter_u8, Classification};
pub use config::RuntimeConfig;
pub use context::{ContextState, NetworkContext, NetworkParams};
pub use error::{ErrorClass, ErrorCode, ErrorKind, NetworkError, RuntimeError};
pub use metrics::{InferenceMetrics, LayerMetrics};
pub use report::{IoInfo, NetworkReport};
pub use weight_loader::{WeightLoader, WeightsBlob};
pub use workspace::Region;

pub use arena_mapper::{ArenaKind, ArenaStats};
