// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer nodes of a compiled network.
//!
//! A [`LayerNode`] never owns data. It names its tensors by index into the
//! graph's tensor table and links to its successor through `next`, an index
//! into the node arena. The terminal node points at itself.

use tensor_core::Axis;

/// Index into a graph's tensor table.
pub type TensorId = usize;

/// The kind of computation a layer performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    /// Valid 2-D convolution with a fused max-pool.
    ConvPool,
    /// Fully connected layer.
    Dense,
    /// Integer softmax along the channel axis.
    Softmax,
}

impl LayerType {
    /// Parses a layer type from a manifest string.
    ///
    /// Accepts both snake_case (`"conv_pool"`) and the names compiled
    /// networks use (`"conv2d"`, `"gemm"`, `"nl"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "conv_pool" | "conv2d" | "optimized_conv2d" | "conv" | "conv2d_nl_pool" => {
                Some(Self::ConvPool)
            }
            "dense" | "gemm" | "fc" | "fully_connected" | "linear" => Some(Self::Dense),
            "softmax" | "sm" | "nl" => Some(Self::Softmax),
            _ => None,
        }
    }

    /// Returns a human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConvPool => "conv_pool",
            Self::Dense => "dense",
            Self::Softmax => "softmax",
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static parameters of a conv + pool layer. Pairs are `[h, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConvPoolConfig {
    pub stride: [usize; 2],
    pub dilation: [usize; 2],
    /// `[top, bottom, left, right]`. Only zero padding is supported.
    #[serde(default)]
    pub padding: [usize; 4],
    pub pool_size: [usize; 2],
    pub pool_stride: [usize; 2],
    #[serde(default = "one")]
    pub groups: usize,
}

fn one() -> usize {
    1
}

impl Default for ConvPoolConfig {
    /// Unit stride and dilation, no padding, pooling disabled.
    fn default() -> Self {
        Self {
            stride: [1, 1],
            dilation: [1, 1],
            padding: [0; 4],
            pool_size: [1, 1],
            pool_stride: [1, 1],
            groups: 1,
        }
    }
}

impl ConvPoolConfig {
    /// Square max-pool of `size` with stride `stride`.
    pub fn with_pool(mut self, size: usize, stride: usize) -> Self {
        self.pool_size = [size, size];
        self.pool_stride = [stride, stride];
        self
    }
}

/// Static parameters of an integer softmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SoftmaxConfig {
    pub axis: Axis,
    /// `[input_multiplier, input_left_shift, diff_min]`, taken as given.
    pub nl_params: [i32; 3],
}

/// The operation a node performs, with its static parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerOp {
    ConvPool(ConvPoolConfig),
    Dense,
    Softmax(SoftmaxConfig),
}

impl LayerOp {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerOp::ConvPool(_) => LayerType::ConvPool,
            LayerOp::Dense => LayerType::Dense,
            LayerOp::Softmax(_) => LayerType::Softmax,
        }
    }

    /// Number of parameter tensors (weights, bias) the op expects.
    pub fn param_count(&self) -> usize {
        match self {
            LayerOp::ConvPool(_) | LayerOp::Dense => 2,
            LayerOp::Softmax(_) => 0,
        }
    }

    /// Number of scratch tensors the op expects.
    pub fn scratch_count(&self) -> usize {
        match self {
            LayerOp::ConvPool(_) => 2,
            LayerOp::Dense | LayerOp::Softmax(_) => 1,
        }
    }
}

/// One node of the layer chain.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerNode {
    /// Layer id assigned by the compiler; not necessarily contiguous.
    pub id: u32,
    pub name: String,
    pub op: LayerOp,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
    /// Weights then bias, for ops that have them.
    #[serde(default)]
    pub params: Vec<TensorId>,
    #[serde(default)]
    pub scratch: Vec<TensorId>,
    /// Index of the successor in the node arena; its own index when terminal.
    pub next: usize,
}

impl LayerNode {
    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "#{} {} ({}) in={:?} out={:?} params={:?} scratch={:?}",
            self.id,
            self.name,
            self.op.layer_type(),
            self.inputs,
            self.outputs,
            self.params,
            self.scratch,
        )
    }
}
