// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution engine.
//!
//! ```text
//! root ──► node ──► node ──► ... ──► terminal (next == self)
//!           │
//!           ├─ ConvPool: per pooled row   load_window → conv_rows → pool_row
//!           ├─ Dense:    per batch row    stage → emit
//!           └─ Softmax:  per pixel row    stage → emit
//! ```
//!
//! Every operand is resolved to a [`Region`] once, when the arenas are
//! bound. A run then only borrows regions out of the [`Workspace`], one
//! source and one destination per phase, and allocates nothing unless
//! profiling is on.

use std::time::Instant;

use arena_mapper::BindingTable;
use model_ir::{graph::Validated, Kernel, LayerNode, ModelGraph, TensorId};
use tensor_core::{bytes_as_i8, bytes_as_i8_mut, ConvPoolKernel, DenseKernel, SoftmaxKernel, TensorError};
use tracing::debug;

use crate::workspace::{Region, Workspace};
use crate::{InferenceMetrics, RuntimeError};

// ── Resolved operands ──────────────────────────────────────────

/// Operand regions of one node.
#[derive(Debug, Clone)]
struct NodeRegions {
    input: Region,
    output: Region,
    params: Vec<Region>,
    scratch: Vec<Region>,
    /// Batch extent of the output tensor.
    batch: usize,
}

/// One node of the chain, ready to run.
#[derive(Debug, Clone)]
struct Step {
    /// Index into the graph's node and kernel tables.
    node: usize,
    regions: NodeRegions,
}

/// The chain of a validated graph resolved against bound arenas.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    steps: Vec<Step>,
    input: Region,
    output: Region,
}

impl Engine {
    /// Resolves every operand of every node to a region of its arena.
    ///
    /// Parameters must live in the weights arena; inputs, outputs and
    /// scratch in the activations arena.
    pub fn prepare(
        graph: &ModelGraph<Validated>,
        weights: &BindingTable,
        activations: &BindingTable,
    ) -> Result<Self, RuntimeError> {
        let resolve = |node: &LayerNode, t: TensorId, table: &BindingTable, arena: &str| {
            let array = graph.tensors[t].array;
            table
                .get(array)
                .map(|b| Region::new(b.buffer, b.offset..b.offset + graph.tensor_bytes(t)))
                .ok_or_else(|| {
                    RuntimeError::InvalidParams(format!(
                        "tensor '{}' of layer '{}' is not bound to the {arena} arena",
                        graph.tensors[t].name, node.name
                    ))
                })
        };
        let io = |t: TensorId, what: &str| {
            let array = graph.tensors[t].array;
            activations
                .get(array)
                .map(|b| Region::new(b.buffer, b.offset..b.offset + graph.tensor_bytes(t)))
                .ok_or_else(|| {
                    RuntimeError::InvalidParams(format!(
                        "{what} '{}' is not bound to the activations arena",
                        graph.tensors[t].name
                    ))
                })
        };

        let mut steps = Vec::with_capacity(graph.num_nodes());
        for (i, node) in graph.chain() {
            let regions = NodeRegions {
                input: resolve(node, node.inputs[0], activations, "activations")?,
                output: resolve(node, node.outputs[0], activations, "activations")?,
                params: node
                    .params
                    .iter()
                    .map(|&t| resolve(node, t, weights, "weights"))
                    .collect::<Result<_, _>>()?,
                scratch: node
                    .scratch
                    .iter()
                    .map(|&t| resolve(node, t, activations, "activations"))
                    .collect::<Result<_, _>>()?,
                batch: graph.tensors[node.outputs[0]].shape.batch,
            };
            steps.push(Step { node: i, regions });
        }

        let (input, output) = match (graph.inputs.as_slice(), graph.outputs.as_slice()) {
            ([i], [o]) => (io(*i, "input")?, io(*o, "output")?),
            (i, o) => {
                return Err(RuntimeError::InvalidParams(format!(
                    "expected one input and one output, network has {} and {}",
                    i.len(),
                    o.len()
                )))
            }
        };

        Ok(Self {
            steps,
            input,
            output,
        })
    }

    /// Region the host input is copied into.
    pub fn input(&self) -> &Region {
        &self.input
    }

    /// Region the terminal node writes the network output to.
    pub fn output(&self) -> &Region {
        &self.output
    }

    /// Runs the chain from the root to the terminal node.
    ///
    /// Returns the number of batch items the terminal node produced.
    pub fn run(
        &self,
        graph: &ModelGraph<Validated>,
        ws: &mut Workspace<'_, '_>,
        mut metrics: Option<&mut InferenceMetrics>,
    ) -> Result<usize, RuntimeError> {
        let mut batches = 0;
        for step in &self.steps {
            let node = &graph.nodes[step.node];
            let kernel = graph.kernel(step.node);
            debug!("running {}", node.summary());

            let started = metrics.is_some().then(Instant::now);
            batches = execute(kernel, &step.regions, ws).map_err(|source| RuntimeError::Execution {
                layer: node.name.clone(),
                source,
            })?;
            if let (Some(m), Some(t0)) = (metrics.as_deref_mut(), started) {
                m.record_layer(&node.name, node.op.layer_type().as_str(), kernel.macc(), t0.elapsed());
            }
        }
        Ok(batches)
    }
}

// ── Kernel phases ──────────────────────────────────────────────

fn execute(kernel: &Kernel, r: &NodeRegions, ws: &mut Workspace<'_, '_>) -> Result<usize, TensorError> {
    match kernel {
        Kernel::ConvPool(k) => conv_pool(k, r, ws),
        Kernel::Dense(k) => dense(k, r, ws),
        Kernel::Softmax(k) => softmax(k, r, ws),
    }
}

fn conv_pool(k: &ConvPoolKernel, r: &NodeRegions, ws: &mut Workspace<'_, '_>) -> Result<usize, TensorError> {
    let g = &k.geometry;
    let weights = bytes_as_i8(ws.weights(&r.params[0])?);
    let bias = ws.weights(&r.params[1])?;
    let (s0, s1) = (&r.scratch[0], &r.scratch[1]);

    for b in 0..g.batch {
        for row in 0..g.pooled_h() {
            let window = r.input.sub(g.input_window(b, row));
            let (src, dst) = ws.pair("conv_pool.load_window", &window, s0)?;
            k.load_window(bytes_as_i8(src), dst)?;

            let (src, dst) = ws.pair("conv_pool.conv_rows", s0, s1)?;
            k.conv_rows(src, weights, bias, dst)?;

            let out_row = r.output.sub(g.output_row(b, row));
            let (src, dst) = ws.pair("conv_pool.pool_row", s1, &out_row)?;
            k.pool_row(src, bytes_as_i8_mut(dst))?;
        }
    }
    Ok(g.batch)
}

fn dense(k: &DenseKernel, r: &NodeRegions, ws: &mut Workspace<'_, '_>) -> Result<usize, TensorError> {
    let weights = bytes_as_i8(ws.weights(&r.params[0])?);
    let bias = ws.weights(&r.params[1])?;
    let s0 = &r.scratch[0];
    let rows = r.input.len() / k.in_features.max(1);

    for row in 0..rows {
        let x = r.input.sub(row * k.in_features..(row + 1) * k.in_features);
        let (src, dst) = ws.pair("dense.stage", &x, s0)?;
        k.stage(bytes_as_i8(src), dst)?;

        let y = r.output.sub(row * k.out_features..(row + 1) * k.out_features);
        let (src, dst) = ws.pair("dense.emit", s0, &y)?;
        k.emit(src, weights, bias, bytes_as_i8_mut(dst))?;
    }
    Ok(r.batch)
}

fn softmax(k: &SoftmaxKernel, r: &NodeRegions, ws: &mut Workspace<'_, '_>) -> Result<usize, TensorError> {
    let s0 = &r.scratch[0];
    let rows = r.input.len() / k.row_len.max(1);

    for row in 0..rows {
        let span = row * k.row_len..(row + 1) * k.row_len;
        let (src, dst) = ws.pair("softmax.stage", &r.input.sub(span.clone()), s0)?;
        k.stage(bytes_as_i8(src), dst)?;

        let (src, dst) = ws.pair("softmax.emit", s0, &r.output.sub(span))?;
        k.emit(src, bytes_as_i8_mut(dst))?;
    }
    // One row per pixel: `rows` is batch x height x width.
    Ok(r.batch)
}
