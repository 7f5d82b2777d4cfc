// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The network context and its lifecycle.
//!
//! ```text
//! NetworkContext::create(graph, params)       ── Created
//!     │  .init(weights, activations)
//!     ▼
//!   Ready ── .run(input, output) ──► batches
//!     │      .forward(input) + .output()
//!     ▼
//! .destroy()  ──► ModelGraph (arenas stay with the host)
//! ```
//!
//! The host owns both arenas. The context borrows them for `'a` and never
//! allocates them; every failing call also records a [`NetworkError`] in the
//! context's error slot.

use std::fmt;
use std::time::Instant;

use arena_mapper::{ArenaKind, ArenaMapper, ArenaStats, BindingTable};
use arena_planner::StrategyKind;
use model_ir::{graph::Validated, ModelGraph};
use tensor_core::{bytes_as_i8, bytes_as_i8_mut};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::workspace::Workspace;
use crate::{InferenceMetrics, IoInfo, NetworkError, NetworkReport, RuntimeError};

/// Lifecycle state of a [`NetworkContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Created and checked, no arenas bound.
    Created,
    /// Arenas bound; runs are allowed.
    Ready,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Created => f.write_str("created"),
            ContextState::Ready => f.write_str("ready"),
        }
    }
}

/// Parameters checked against the network at creation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkParams {
    /// Host buffers the weights arena will be split across.
    pub weights_buffers: usize,
    /// Host buffers the activations arena will be split across.
    pub activations_buffers: usize,
    /// Batches per run.
    pub batches: usize,
    /// Prove the activation layout alias-free before accepting the network.
    pub verify_placement: bool,
    /// Record per-layer metrics on every run.
    pub enable_profiling: bool,
}

impl NetworkParams {
    /// Parameters matching a graph's own declaration.
    pub fn for_graph(graph: &ModelGraph<Validated>) -> Self {
        Self {
            weights_buffers: graph.arenas.weights.buffers,
            activations_buffers: graph.arenas.activations.buffers,
            batches: graph.info.batches,
            ..Self::default()
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            weights_buffers: 1,
            activations_buffers: 1,
            batches: 1,
            verify_placement: true,
            enable_profiling: false,
        }
    }
}

/// Arena state that only exists once `init` has succeeded.
struct Bound<'a> {
    weights: Vec<&'a [u8]>,
    activations: Vec<&'a mut [u8]>,
    weight_bindings: BindingTable,
    activation_bindings: BindingTable,
    engine: Engine,
}

/// An inference network bound to host-owned arenas.
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use runtime::{NetworkContext, NetworkParams};
///
/// let graph = ModelLoader::builtin().unwrap();
/// let weights = vec![0u8; graph.arenas.weights.size_bytes];
/// let mut activations = vec![0u8; graph.arenas.activations.size_bytes];
///
/// let params = NetworkParams::for_graph(&graph);
/// let mut ctx = NetworkContext::create_and_init(
///     graph,
///     params,
///     vec![&weights[..]],
///     vec![&mut activations[..]],
/// )
/// .unwrap();
///
/// let image = [0i8; 784];
/// let mut scores = [0i8; 10];
/// assert_eq!(ctx.run(&image, &mut scores).unwrap(), 1);
/// ```
pub struct NetworkContext<'a> {
    graph: ModelGraph<Validated>,
    params: NetworkParams,
    state: ContextState,
    bound: Option<Bound<'a>>,
    error: NetworkError,
    metrics: Option<InferenceMetrics>,
}

// ── Created ────────────────────────────────────────────────────

impl<'a> NetworkContext<'a> {
    /// Checks `params` against the network and returns a `Created` context.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidParams`] on a buffer count mismatch or a
    ///   network without exactly one input and one output.
    /// - [`RuntimeError::BatchMismatch`] if `params.batches` differs from
    ///   the compiled batch count.
    /// - [`RuntimeError::Placement`] if placement verification fails.
    pub fn create(graph: ModelGraph<Validated>, params: NetworkParams) -> Result<Self, RuntimeError> {
        let declared = [
            ("weights", params.weights_buffers, graph.arenas.weights.buffers),
            ("activations", params.activations_buffers, graph.arenas.activations.buffers),
        ];
        for (kind, given, expected) in declared {
            if given != expected {
                return Err(RuntimeError::InvalidParams(format!(
                    "{kind} arena declares {expected} buffer(s), params give {given}"
                )));
            }
        }
        if params.batches != graph.info.batches {
            return Err(RuntimeError::BatchMismatch {
                expected: graph.info.batches,
                actual: params.batches,
            });
        }
        if graph.inputs.len() != 1 || graph.outputs.len() != 1 {
            return Err(RuntimeError::InvalidParams(format!(
                "expected one input and one output, network has {} and {}",
                graph.inputs.len(),
                graph.outputs.len()
            )));
        }
        if params.verify_placement {
            let plan = arena_planner::plan_with(&graph, StrategyKind::Precomputed)?;
            info!("placement verified: {}", plan.summary());
        }

        info!("network '{}' created: {}", graph.info.name, graph.summary());
        Ok(Self {
            graph,
            params,
            state: ContextState::Created,
            bound: None,
            error: NetworkError::NONE,
            metrics: None,
        })
    }

    /// `create` followed by `init`.
    pub fn create_and_init(
        graph: ModelGraph<Validated>,
        params: NetworkParams,
        weights: Vec<&'a [u8]>,
        activations: Vec<&'a mut [u8]>,
    ) -> Result<Self, RuntimeError> {
        let mut ctx = Self::create(graph, params)?;
        ctx.init(weights, activations)?;
        Ok(ctx)
    }

    /// Binds the host arenas, weights first, and moves to `Ready`.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidState`] if the context is already `Ready`.
    /// - [`RuntimeError::WeightsBinding`] / [`RuntimeError::ActivationsBinding`]
    ///   if the buffers do not match the declared arenas.
    pub fn init(&mut self, weights: Vec<&'a [u8]>, activations: Vec<&'a mut [u8]>) -> Result<(), RuntimeError> {
        let result = self.bind(weights, activations);
        self.record(result)
    }

    fn bind(&mut self, weights: Vec<&'a [u8]>, activations: Vec<&'a mut [u8]>) -> Result<(), RuntimeError> {
        if self.state != ContextState::Created {
            return Err(RuntimeError::InvalidState {
                op: "init",
                state: self.state,
            });
        }
        let g = &self.graph;
        let lens: Vec<usize> = weights.iter().map(|b| b.len()).collect();
        let weight_bindings = ArenaMapper::bind(ArenaKind::Weights, &g.arenas, &g.arrays, &lens)
            .map_err(RuntimeError::WeightsBinding)?;
        let lens: Vec<usize> = activations.iter().map(|b| b.len()).collect();
        let activation_bindings = ArenaMapper::bind(ArenaKind::Activations, &g.arenas, &g.arrays, &lens)
            .map_err(RuntimeError::ActivationsBinding)?;
        let engine = Engine::prepare(g, &weight_bindings, &activation_bindings)?;

        self.bound = Some(Bound {
            weights,
            activations,
            weight_bindings,
            activation_bindings,
            engine,
        });
        self.state = ContextState::Ready;
        self.error = NetworkError::NONE;
        info!(
            "network '{}' initialised: {} weights + {} activations array(s) bound",
            self.graph.info.name,
            self.bound.as_ref().map_or(0, |b| b.weight_bindings.len()),
            self.bound.as_ref().map_or(0, |b| b.activation_bindings.len()),
        );
        Ok(())
    }
}

// ── Ready ──────────────────────────────────────────────────────

impl NetworkContext<'_> {
    /// Runs one inference from `input` into `output`.
    ///
    /// Both buffers must match the byte size of the network's input and
    /// output tensors. Returns the number of batches processed.
    pub fn run(&mut self, input: &[i8], output: &mut [i8]) -> Result<usize, RuntimeError> {
        let result = self.run_inner(input, Some(output));
        self.record(result)
    }

    /// Runs one inference and leaves the result in the activations arena;
    /// read it with [`output`](Self::output).
    pub fn forward(&mut self, input: &[i8]) -> Result<usize, RuntimeError> {
        let result = self.run_inner(input, None);
        self.record(result)
    }

    /// The network output left in the activations arena by the last run.
    pub fn output(&self) -> Result<&[i8], RuntimeError> {
        let bound = self.bound.as_ref().ok_or(RuntimeError::NotInitialised { op: "output" })?;
        let region = bound.engine.output();
        let buf = bound
            .activations
            .get(region.buffer)
            .and_then(|b| b.get(region.range.clone()))
            .ok_or_else(|| RuntimeError::InvalidParams("output region is outside its buffer".into()))?;
        Ok(bytes_as_i8(buf))
    }

    fn run_inner(&mut self, input: &[i8], output: Option<&mut [i8]>) -> Result<usize, RuntimeError> {
        let op = if output.is_some() { "run" } else { "forward" };
        let started = Instant::now();
        let Some(bound) = self.bound.as_mut() else {
            return Err(RuntimeError::NotInitialised { op });
        };
        let engine = &bound.engine;

        let in_region = engine.input();
        if input.len() != in_region.len() {
            return Err(RuntimeError::InputSize {
                tensor: self.graph.tensors[self.graph.inputs[0]].name.clone(),
                expected: in_region.len(),
                actual: input.len(),
            });
        }
        let out_region = engine.output();
        if let Some(out) = &output {
            if out.len() != out_region.len() {
                return Err(RuntimeError::OutputSize {
                    tensor: self.graph.tensors[self.graph.outputs[0]].name.clone(),
                    expected: out_region.len(),
                    actual: out.len(),
                });
            }
        }

        let mut ws = Workspace::new(&bound.weights, &mut bound.activations);
        let io_error = |source| RuntimeError::Execution {
            layer: "io".into(),
            source,
        };
        bytes_as_i8_mut(ws.write(in_region).map_err(io_error)?).copy_from_slice(input);

        let mut metrics = self
            .params
            .enable_profiling
            .then(|| InferenceMetrics::new(self.graph.num_nodes()));
        let batches = engine.run(&self.graph, &mut ws, metrics.as_mut())?;
        if batches != self.params.batches {
            return Err(RuntimeError::BatchCount {
                expected: self.params.batches,
                actual: batches,
            });
        }

        if let Some(out) = output {
            out.copy_from_slice(bytes_as_i8(ws.read(out_region).map_err(io_error)?));
        }
        if let Some(mut m) = metrics {
            m.finalise(started.elapsed(), batches);
            tracing::debug!("{}", m.summary());
            self.metrics = Some(m);
        }
        Ok(batches)
    }
}

// ── Any state ──────────────────────────────────────────────────

impl<'a> NetworkContext<'a> {
    /// The most recent failure, or `NONE/NONE`.
    pub fn get_error(&self) -> NetworkError {
        self.error
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.graph
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Descriptions of the network inputs, for sizing host buffers.
    pub fn inputs(&self) -> Vec<IoInfo> {
        self.graph.inputs.iter().map(|&t| IoInfo::from_tensor(&self.graph, t)).collect()
    }

    /// Descriptions of the network outputs.
    pub fn outputs(&self) -> Vec<IoInfo> {
        self.graph.outputs.iter().map(|&t| IoInfo::from_tensor(&self.graph, t)).collect()
    }

    pub fn report(&self) -> NetworkReport {
        NetworkReport::new(&self.graph)
    }

    /// Per-layer metrics of the last run, when profiling is enabled.
    pub fn last_metrics(&self) -> Option<&InferenceMetrics> {
        self.metrics.as_ref()
    }

    /// Occupancy of a bound arena; `None` before `init`.
    pub fn arena_stats(&self, kind: ArenaKind) -> Option<ArenaStats> {
        let bound = self.bound.as_ref()?;
        let table = match kind {
            ArenaKind::Weights => &bound.weight_bindings,
            ArenaKind::Activations => &bound.activation_bindings,
        };
        let decl = self.graph.arenas.decl(kind);
        Some(ArenaStats::from_table(kind, decl.buffers, decl.total_bytes(), table))
    }

    /// Releases the context and returns its graph. The arenas go back to
    /// the host when their borrows end.
    pub fn destroy(self) -> ModelGraph<Validated> {
        info!("network '{}' destroyed", self.graph.info.name);
        self.graph
    }

    fn record<T>(&mut self, result: Result<T, RuntimeError>) -> Result<T, RuntimeError> {
        if let Err(e) = &result {
            self.error = e.network_error();
            warn!("network '{}': {e} [{}]", self.graph.info.name, self.error);
        }
        result
    }
}

impl fmt::Debug for NetworkContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkContext")
            .field("network", &self.graph.info.name)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("error", &self.error)
            .finish()
    }
}
