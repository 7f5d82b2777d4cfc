// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network graph: arrays, tensors and a chain of layer nodes.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Loaded>    : tables assembled, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated> : chain walked, shapes and quantization checked,
//!                          kernels precomputed; ready for binding.
//! ```
//!
//! Only a validated graph can be handed to the planner or the runtime.

use std::fmt;
use std::marker::PhantomData;

use arena_mapper::{ArenaKind, ArenaLayout};
use tensor_core::{
    ArrayClass, ArrayDef, ArrayId, Axis, ConvGeometry, ConvPoolKernel, DType, DenseKernel,
    QuantPair, Requantizer, Shape, SoftmaxKernel, TensorDesc, TensorError,
    SOFTMAX_OUTPUT_ZERO_POINT,
};
use tracing::{debug, warn};

use crate::{ConvPoolConfig, Kernel, LayerNode, LayerOp, ModelError, ModelInfo, SoftmaxConfig, TensorId};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been assembled but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and carries precomputed kernels.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A compiled network as flat tables linked by index.
///
/// Nodes form a singly linked chain through [`LayerNode::next`], starting at
/// `root`. The generic parameter `S` encodes the validation state.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    pub info: ModelInfo,
    pub arenas: ArenaLayout,
    pub arrays: Vec<ArrayDef>,
    pub tensors: Vec<TensorDesc>,
    pub nodes: Vec<LayerNode>,
    /// Index of the first node to execute.
    pub root: usize,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
    /// One kernel per node, indexed like `nodes`. Empty until validated.
    kernels: Vec<Kernel>,
    /// Node indices in execution order. Empty until validated.
    order: Vec<usize>,
    _state: PhantomData<S>,
}

impl<S: GraphState> ModelGraph<S> {
    /// Backing array of tensor `t`.
    ///
    /// # Panics
    /// Panics if `t` is not a valid tensor index.
    pub fn array_of(&self, t: TensorId) -> &ArrayDef {
        &self.arrays[self.tensors[t].array]
    }

    /// Bytes addressed by tensor `t` in its backing array.
    pub fn tensor_bytes(&self, t: TensorId) -> usize {
        self.tensors[t].span() * self.array_of(t).dtype.size_bytes()
    }

    /// Arrays living in the arena of `kind`.
    pub fn arrays_in(&self, kind: ArenaKind) -> impl Iterator<Item = (ArrayId, &ArrayDef)> {
        self.arrays
            .iter()
            .enumerate()
            .filter(move |(_, a)| ArenaKind::for_class(a.class) == kind)
    }
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates an empty graph in the `Loaded` state.
    pub fn new(info: ModelInfo, arenas: ArenaLayout) -> Self {
        Self {
            info,
            arenas,
            arrays: Vec::new(),
            tensors: Vec::new(),
            nodes: Vec::new(),
            root: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            kernels: Vec::new(),
            order: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Appends an array and returns its id.
    pub fn push_array(&mut self, array: ArrayDef) -> ArrayId {
        self.arrays.push(array);
        self.arrays.len() - 1
    }

    /// Appends a tensor and returns its id.
    pub fn push_tensor(&mut self, tensor: TensorDesc) -> TensorId {
        self.tensors.push(tensor);
        self.tensors.len() - 1
    }

    /// Appends a node and returns its index in the node arena.
    pub fn push_node(&mut self, node: LayerNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The chain from `root` reaches every node exactly once and ends on a
    ///   node whose `next` is itself.
    /// - Every array fits its declared arena buffer.
    /// - Every tensor stays inside its array and carries consistent
    ///   quantization.
    /// - Each node has the tensors its op needs, with matching shapes,
    ///   element formats and quantization; kernels are derived here.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        let order = self.walk_chain()?;
        self.check_arrays()?;
        self.check_tensors()?;

        let mut kernels = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let kernel = self.build_kernel(node)?;
            self.check_scratch(node, &kernel)?;
            debug!("validated {}", node.summary());
            kernels.push(kernel);
        }

        Ok(ModelGraph {
            info: self.info,
            arenas: self.arenas,
            arrays: self.arrays,
            tensors: self.tensors,
            nodes: self.nodes,
            root: self.root,
            inputs: self.inputs,
            outputs: self.outputs,
            kernels,
            order,
            _state: PhantomData,
        })
    }

    fn walk_chain(&self) -> Result<Vec<usize>, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph("graph contains no layers".into()));
        }
        if self.root >= self.nodes.len() {
            return Err(ModelError::InvalidGraph(format!(
                "root {} out of range for {} node(s)",
                self.root,
                self.nodes.len()
            )));
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut i = self.root;
        loop {
            if visited[i] {
                return Err(ModelError::InvalidGraph(format!(
                    "cycle through layer '{}'",
                    self.nodes[i].name
                )));
            }
            visited[i] = true;
            order.push(i);
            let next = self.nodes[i].next;
            if next >= self.nodes.len() {
                return Err(ModelError::InvalidLayer {
                    layer: self.nodes[i].name.clone(),
                    detail: format!("next index {next} out of range"),
                });
            }
            if next == i {
                break;
            }
            i = next;
        }

        if let Some(lost) = visited.iter().position(|v| !v) {
            return Err(ModelError::InvalidGraph(format!(
                "layer '{}' is not reachable from the root",
                self.nodes[lost].name
            )));
        }
        Ok(order)
    }

    fn check_arrays(&self) -> Result<(), ModelError> {
        for array in &self.arrays {
            let decl = self.arenas.decl(ArenaKind::for_class(array.class));
            if array.buffer >= decl.buffers {
                return Err(ModelError::InvalidArray {
                    array: array.name.clone(),
                    detail: format!(
                        "buffer {} but the {} arena declares {}",
                        array.buffer,
                        ArenaKind::for_class(array.class),
                        decl.buffers
                    ),
                });
            }
            if array.end() > decl.size_bytes {
                return Err(ModelError::InvalidArray {
                    array: array.name.clone(),
                    detail: format!("ends at {} past arena size {}", array.end(), decl.size_bytes),
                });
            }
        }
        Ok(())
    }

    fn check_tensors(&self) -> Result<(), ModelError> {
        for t in &self.tensors {
            let array = self.arrays.get(t.array).ok_or_else(|| ModelError::UnknownName {
                kind: "array",
                name: format!("#{} (tensor '{}')", t.array, t.name),
            })?;
            t.validate(array).map_err(|source| ModelError::InvalidTensor {
                tensor: t.name.clone(),
                source,
            })?;
        }

        if self.inputs.is_empty() || self.outputs.is_empty() {
            return Err(ModelError::InvalidGraph(
                "graph declares no input or no output".into(),
            ));
        }
        for &t in self.inputs.iter().chain(&self.outputs) {
            let tensor = self.tensors.get(t).ok_or_else(|| ModelError::UnknownName {
                kind: "tensor",
                name: format!("#{t}"),
            })?;
            let array = &self.arrays[tensor.array];
            if array.class != ArrayClass::Transient || array.dtype != DType::I8 {
                return Err(ModelError::InvalidGraph(format!(
                    "I/O tensor '{}' must be a transient i8 array",
                    tensor.name
                )));
            }
            if tensor.shape.batch != self.info.batches {
                return Err(ModelError::InvalidGraph(format!(
                    "I/O tensor '{}' has batch {} but the network runs {}",
                    tensor.name, tensor.shape.batch, self.info.batches
                )));
            }
        }
        Ok(())
    }

    fn tensor(&self, node: &LayerNode, t: TensorId) -> Result<&TensorDesc, ModelError> {
        self.tensors.get(t).ok_or_else(|| ModelError::InvalidLayer {
            layer: node.name.clone(),
            detail: format!("tensor #{t} does not exist"),
        })
    }

    /// Checks arity, element format and layout of the node's tensors.
    fn operands(&self, node: &LayerNode) -> Result<Operands<'_>, ModelError> {
        let op = &node.op;
        let arity = [
            ("input", node.inputs.len(), 1),
            ("output", node.outputs.len(), 1),
            ("parameter", node.params.len(), op.param_count()),
            ("scratch", node.scratch.len(), op.scratch_count()),
        ];
        if let Some((what, got, want)) = arity.iter().find(|(_, got, want)| got != want) {
            return Err(ModelError::InvalidLayer {
                layer: node.name.clone(),
                detail: format!("{} expects {want} {what} tensor(s), got {got}", op.layer_type()),
            });
        }

        let input = self.tensor(node, node.inputs[0])?;
        let output = self.tensor(node, node.outputs[0])?;
        let params = node
            .params
            .iter()
            .map(|&t| self.tensor(node, t))
            .collect::<Result<Vec<_>, _>>()?;

        let mut expect = vec![(input, DType::I8), (output, DType::I8)];
        if let [w, b] = params[..] {
            expect.push((w, DType::I8));
            expect.push((b, DType::I32));
        }
        for (t, dtype) in expect {
            let array = &self.arrays[t.array];
            if array.dtype != dtype {
                return Err(ModelError::Unsupported {
                    layer: node.name.clone(),
                    detail: format!(
                        "tensor '{}' is {}, expected {}",
                        t.name,
                        array.dtype.as_str(),
                        dtype.as_str()
                    ),
                });
            }
            if !t.strides.is_contiguous(&t.shape) {
                return Err(ModelError::Unsupported {
                    layer: node.name.clone(),
                    detail: format!("tensor '{}' has non-contiguous strides {}", t.name, t.strides),
                });
            }
        }

        Ok(Operands {
            input,
            output,
            weights: params.first().copied(),
            bias: params.get(1).copied(),
        })
    }

    fn build_kernel(&self, node: &LayerNode) -> Result<Kernel, ModelError> {
        let ops = self.operands(node)?;
        match &node.op {
            LayerOp::ConvPool(cfg) => self.conv_pool_kernel(node, cfg, &ops).map(Kernel::ConvPool),
            LayerOp::Dense => self.dense_kernel(node, &ops).map(Kernel::Dense),
            LayerOp::Softmax(cfg) => self.softmax_kernel(node, cfg, &ops).map(Kernel::Softmax),
        }
    }

    fn conv_pool_kernel(
        &self,
        node: &LayerNode,
        cfg: &ConvPoolConfig,
        ops: &Operands<'_>,
    ) -> Result<ConvPoolKernel, ModelError> {
        if cfg.padding != [0; 4] {
            return Err(unsupported(node, format!("padding {:?}; only valid padding", cfg.padding)));
        }
        if cfg.groups != 1 {
            return Err(unsupported(node, format!("{} groups", cfg.groups)));
        }
        let (w, bias) = ops.params(node)?;
        let (x, y) = (&ops.input.shape, &ops.output.shape);

        let geometry = ConvGeometry {
            batch: x.batch,
            in_h: x.height,
            in_w: x.width,
            in_c: x.channels,
            out_c: w.shape.batch,
            kernel_h: w.shape.height,
            kernel_w: w.shape.width,
            stride_h: cfg.stride[0],
            stride_w: cfg.stride[1],
            dilation_h: cfg.dilation[0],
            dilation_w: cfg.dilation[1],
            pool_h: cfg.pool_size[0],
            pool_w: cfg.pool_size[1],
            pool_stride_h: cfg.pool_stride[0],
            pool_stride_w: cfg.pool_stride[1],
        };
        geometry.validate().map_err(|e| kernel_err(node, e))?;
        if w.shape.channels != x.channels {
            return Err(invalid(
                node,
                format!("weights expect {} input channels, input has {}", w.shape.channels, x.channels),
            ));
        }
        let expected = Shape::new(x.batch, geometry.out_c, geometry.pooled_h(), geometry.pooled_w());
        if *y != expected {
            return Err(ModelError::InvalidLayer {
                layer: node.name.clone(),
                detail: TensorError::ShapeMismatch {
                    op: "conv_pool",
                    lhs: expected,
                    rhs: *y,
                }
                .to_string(),
            });
        }
        if bias.num_elements() != geometry.out_c {
            return Err(invalid(
                node,
                format!("bias has {} values for {} channels", bias.num_elements(), geometry.out_c),
            ));
        }

        let (in_q, out_q) = (activation_quant(node, ops.input)?, activation_quant(node, ops.output)?);
        Ok(ConvPoolKernel {
            geometry,
            input_zero_point: i32::from(in_q.zero_point),
            output_zero_point: i32::from(out_q.zero_point),
            requant: requantizers(node, w, in_q, out_q, geometry.out_c)?,
        })
    }

    fn dense_kernel(&self, node: &LayerNode, ops: &Operands<'_>) -> Result<DenseKernel, ModelError> {
        let (w, bias) = ops.params(node)?;
        let x = &ops.input.shape;
        let in_features = x.channels * x.height * x.width;
        let out_features = w.shape.batch;
        let w_in = w.shape.channels * w.shape.height * w.shape.width;
        if w_in != in_features {
            return Err(invalid(
                node,
                format!("weights expect {w_in} input features, input has {in_features}"),
            ));
        }
        let y = &ops.output.shape;
        if y.batch != x.batch || y.channels * y.height * y.width != out_features {
            return Err(invalid(
                node,
                format!("output {y} does not hold {} x {out_features} features", x.batch),
            ));
        }
        if bias.num_elements() != out_features {
            return Err(invalid(
                node,
                format!("bias has {} values for {out_features} features", bias.num_elements()),
            ));
        }

        let (in_q, out_q) = (activation_quant(node, ops.input)?, activation_quant(node, ops.output)?);
        Ok(DenseKernel {
            in_features,
            out_features,
            input_zero_point: i32::from(in_q.zero_point),
            output_zero_point: i32::from(out_q.zero_point),
            requant: requantizers(node, w, in_q, out_q, out_features)?,
        })
    }

    fn softmax_kernel(
        &self,
        node: &LayerNode,
        cfg: &SoftmaxConfig,
        ops: &Operands<'_>,
    ) -> Result<SoftmaxKernel, ModelError> {
        if cfg.axis != Axis::Channel {
            return Err(unsupported(node, format!("softmax along {}", cfg.axis.as_str())));
        }
        if ops.input.shape != ops.output.shape {
            return Err(invalid(
                node,
                format!("input {} and output {} differ", ops.input.shape, ops.output.shape),
            ));
        }
        let out_q = activation_quant(node, ops.output)?;
        if out_q.scale != 1.0 / 256.0 || i32::from(out_q.zero_point) != SOFTMAX_OUTPUT_ZERO_POINT {
            warn!(
                "softmax '{}' output is quantized ({}, {}); kernel emits (0.00390625, {})",
                node.name, out_q.scale, out_q.zero_point, SOFTMAX_OUTPUT_ZERO_POINT
            );
        }
        SoftmaxKernel::from_params(ops.input.shape.channels, cfg.nl_params).map_err(|e| kernel_err(node, e))
    }

    fn check_scratch(&self, node: &LayerNode, kernel: &Kernel) -> Result<(), ModelError> {
        for (slot, (&t, needed)) in node.scratch.iter().zip(kernel.scratch_bytes()).enumerate() {
            let tensor = self.tensor(node, t)?;
            if self.arrays[tensor.array].class != ArrayClass::Transient {
                return Err(invalid(node, format!("scratch {slot} '{}' is not transient", tensor.name)));
            }
            let available = self.tensor_bytes(t);
            if available < needed {
                return Err(kernel_err(
                    node,
                    TensorError::ScratchTooSmall {
                        op: node.op.layer_type().as_str(),
                        needed,
                        available,
                    },
                ));
            }
        }
        Ok(())
    }
}

/// Resolved tensors of one node.
struct Operands<'a> {
    input: &'a TensorDesc,
    output: &'a TensorDesc,
    weights: Option<&'a TensorDesc>,
    bias: Option<&'a TensorDesc>,
}

impl<'a> Operands<'a> {
    fn params(&self, node: &LayerNode) -> Result<(&'a TensorDesc, &'a TensorDesc), ModelError> {
        match (self.weights, self.bias) {
            (Some(w), Some(b)) => Ok((w, b)),
            _ => Err(invalid(node, "missing weights or bias".into())),
        }
    }
}

fn invalid(node: &LayerNode, detail: String) -> ModelError {
    ModelError::InvalidLayer {
        layer: node.name.clone(),
        detail,
    }
}

fn unsupported(node: &LayerNode, detail: String) -> ModelError {
    ModelError::Unsupported {
        layer: node.name.clone(),
        detail,
    }
}

fn kernel_err(node: &LayerNode, source: TensorError) -> ModelError {
    ModelError::Kernel {
        layer: node.name.clone(),
        source,
    }
}

/// The single `(scale, zero_point)` of an activation tensor.
fn activation_quant(node: &LayerNode, t: &TensorDesc) -> Result<QuantPair, ModelError> {
    let q = t.require_quant().map_err(|e| kernel_err(node, e))?;
    q.uniform()
        .ok_or_else(|| unsupported(node, format!("activation '{}' is quantized per channel", t.name)))
}

/// One requantizer per output channel; weights must be symmetric.
fn requantizers(
    node: &LayerNode,
    w: &TensorDesc,
    in_q: QuantPair,
    out_q: QuantPair,
    out_c: usize,
) -> Result<Vec<Requantizer>, ModelError> {
    let wq = w.require_quant().map_err(|e| kernel_err(node, e))?;
    if wq.len() != 1 && wq.len() != out_c {
        return Err(invalid(
            node,
            format!("{} weight scales for {out_c} output channels", wq.len()),
        ));
    }
    (0..out_c)
        .map(|c| {
            let p = wq.pair(c);
            if p.zero_point != 0 {
                return Err(unsupported(
                    node,
                    format!("weight zero point {} on channel {c}; weights must be symmetric", p.zero_point),
                ));
            }
            Ok(Requantizer::for_layer(in_q.scale, p.scale, out_q.scale))
        })
        .collect()
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Number of layer nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in execution order with their arena index.
    pub fn chain(&self) -> impl Iterator<Item = (usize, &LayerNode)> {
        self.order.iter().map(|&i| (i, &self.nodes[i]))
    }

    /// Node indices in execution order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Precomputed kernel of node `i`.
    pub fn kernel(&self, i: usize) -> &Kernel {
        &self.kernels[i]
    }

    /// Sum of kernel multiply-accumulates.
    pub fn estimated_macc(&self) -> u64 {
        self.kernels.iter().map(Kernel::macc).sum()
    }

    /// Total bytes of persistent arrays.
    pub fn weight_bytes(&self) -> usize {
        self.arrays_in(ArenaKind::Weights).map(|(_, a)| a.size_bytes()).sum()
    }

    /// Consumes the graph and returns it to the `Loaded` state, e.g. to
    /// rewrite array offsets before validating again.
    pub fn into_loaded(self) -> ModelGraph<Loaded> {
        ModelGraph {
            info: self.info,
            arenas: self.arenas,
            arrays: self.arrays,
            tensors: self.tensors,
            nodes: self.nodes,
            root: self.root,
            inputs: self.inputs,
            outputs: self.outputs,
            kernels: Vec::new(),
            order: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Network '{}': {} layer(s), {} array(s), {} tensor(s), weights {} B, activations {} B, ~{} MACC",
            self.info.name,
            self.num_nodes(),
            self.arrays.len(),
            self.tensors.len(),
            self.arenas.weights.total_bytes(),
            self.arenas.activations.total_bytes(),
            self.estimated_macc(),
        )
    }
}

impl fmt::Display for ModelGraph<Validated> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for (_, node) in self.chain() {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use arena_mapper::ArenaDecl;
    use tensor_core::QuantParams;

    /// Dense 4 → 2 followed by softmax, small enough to reason about.
    fn tiny_graph() -> ModelGraph<Loaded> {
        let mut g = ModelGraph::new(
            ModelInfo::new("tiny"),
            ArenaLayout {
                weights: ArenaDecl::single(16),
                activations: ArenaDecl::single(64),
            },
        );
        let w = g.push_array(ArrayDef::persistent("fc_w", DType::I8, 8, 0));
        let b = g.push_array(ArrayDef::persistent("fc_b", DType::I32, 2, 8));
        let x = g.push_array(ArrayDef::transient("x", DType::I8, 4, 0).with_io());
        let s = g.push_array(ArrayDef::transient("fc_s0", DType::I16, 4, 8));
        let h = g.push_array(ArrayDef::transient("fc_out", DType::I8, 2, 4));
        let ss = g.push_array(ArrayDef::transient("sm_s0", DType::I32, 3, 16));
        let y = g.push_array(ArrayDef::transient("y", DType::I8, 2, 28).with_io());

        let tw = g.push_tensor(TensorDesc::with_quant(
            "fc_w",
            Shape::new(2, 4, 1, 1),
            w,
            QuantParams::per_channel(&[0.01, 0.02], 0),
            Axis::Batch,
        ));
        let tb = g.push_tensor(TensorDesc::plain("fc_b", Shape::vector(2), b));
        let tx = g.push_tensor(TensorDesc::activation("x", Shape::vector(4), x, 0.1, 0));
        let ts = g.push_tensor(TensorDesc::plain("fc_s0", Shape::vector(4), s));
        let th = g.push_tensor(TensorDesc::activation("fc_out", Shape::vector(2), h, 0.2, 10));
        let tss = g.push_tensor(TensorDesc::plain("sm_s0", Shape::vector(3), ss));
        let ty = g.push_tensor(TensorDesc::activation("y", Shape::vector(2), y, 1.0 / 256.0, -128));

        g.push_node(LayerNode {
            id: 1,
            name: "fc".into(),
            op: LayerOp::Dense,
            inputs: vec![tx],
            outputs: vec![th],
            params: vec![tw, tb],
            scratch: vec![ts],
            next: 1,
        });
        g.push_node(LayerNode {
            id: 2,
            name: "sm".into(),
            op: LayerOp::Softmax(SoftmaxConfig {
                axis: Axis::Channel,
                nl_params: [1_811_637_632, 24, -124],
            }),
            inputs: vec![th],
            outputs: vec![ty],
            params: vec![],
            scratch: vec![tss],
            next: 1,
        });
        g.inputs = vec![tx];
        g.outputs = vec![ty];
        g
    }

    #[test]
    fn test_validate_tiny() {
        let g = tiny_graph().validate().unwrap();
        assert_eq!(g.order(), &[0, 1]);
        assert!(matches!(g.kernel(0), Kernel::Dense(k) if k.in_features == 4 && k.out_features == 2));
        assert!(matches!(g.kernel(1), Kernel::Softmax(k) if k.row_len == 2));
        assert_eq!(g.estimated_macc(), 8 + 2);
        assert_eq!(g.weight_bytes(), 16);
    }

    #[test]
    fn test_empty_graph_rejected() {
        let g = ModelGraph::new(
            ModelInfo::new("empty"),
            ArenaLayout {
                weights: ArenaDecl::single(0),
                activations: ArenaDecl::single(0),
            },
        );
        assert!(matches!(g.validate(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut g = tiny_graph();
        g.nodes[1].next = 0;
        let err = g.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"), "{err}");
    }

    #[test]
    fn test_unreachable_rejected() {
        let mut g = tiny_graph();
        g.nodes[0].next = 0;
        let err = g.validate().unwrap_err();
        assert!(err.to_string().contains("not reachable"), "{err}");
    }

    #[test]
    fn test_array_past_arena() {
        let mut g = tiny_graph();
        g.arrays[6].offset = 63;
        assert!(matches!(g.validate(), Err(ModelError::InvalidArray { .. })));
    }

    #[test]
    fn test_scratch_too_small() {
        let mut g = tiny_graph();
        g.tensors[3].shape = Shape::vector(3);
        g.tensors[3].strides = g.tensors[3].shape.strides();
        let err = g.validate().unwrap_err();
        assert!(matches!(
            err,
            ModelError::Kernel {
                source: TensorError::ScratchTooSmall { needed: 8, available: 6, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_asymmetric_weights_rejected() {
        let mut g = tiny_graph();
        g.tensors[0].quant = Some(QuantParams::per_channel(&[0.01, 0.02], 3));
        assert!(matches!(g.validate(), Err(ModelError::Unsupported { .. })));
    }

    #[test]
    fn test_wrong_bias_dtype() {
        let mut g = tiny_graph();
        g.arrays[1].dtype = DType::I16;
        assert!(matches!(g.validate(), Err(ModelError::Unsupported { .. })));
    }

    #[test]
    fn test_padding_unsupported() {
        let mut g = builtin::digit_classifier();
        if let LayerOp::ConvPool(cfg) = &mut g.nodes[0].op {
            cfg.padding = [1, 1, 1, 1];
        }
        assert!(matches!(g.validate(), Err(ModelError::Unsupported { .. })));
    }

    #[test]
    fn test_conv_output_shape_checked() {
        let mut g = builtin::digit_classifier();
        g.tensors[1].shape = Shape::new(1, 16, 12, 13);
        g.tensors[1].strides = g.tensors[1].shape.strides();
        assert!(matches!(g.validate(), Err(ModelError::InvalidLayer { .. })));
    }

    #[test]
    fn test_into_loaded_roundtrip() {
        let g = tiny_graph().validate().unwrap();
        let again = g.clone().into_loaded().validate().unwrap();
        assert_eq!(again.order(), g.order());
        assert!(again.to_string().contains("#2 sm (softmax)"));
    }
}
