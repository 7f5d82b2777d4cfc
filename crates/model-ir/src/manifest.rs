// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! The manifest (`model.json`) describes a compiled network by name: arrays
//! carry their arena offsets, tensors and layers refer to each other by
//! name, and the layer chain is spelled out through `next`.
//!
//! # Format
//! ```json
//! {
//!   "info": { "name": "network", "signature": "0x4eef…", "datetime": "…" },
//!   "arenas": {
//!     "weights": { "size_bytes": 109176, "buffers": 1 },
//!     "activations": { "size_bytes": 9712, "buffers": 1 }
//!   },
//!   "arrays": [
//!     { "name": "gemm_6_bias", "dtype": "i32", "len": 10,
//!       "class": "persistent", "offset": 109136 },
//!     ...
//!   ],
//!   "tensors": [
//!     { "name": "gemm_6_output", "shape": { "batch": 1, "channels": 10, "height": 1, "width": 1 },
//!       "array": "gemm_6_output", "quant": { "per_tensor": { "scale": 0.2109, "zero_point": 44 } } },
//!     ...
//!   ],
//!   "layers": [
//!     { "id": 6, "name": "gemm_6", "layer_type": "gemm",
//!       "inputs": ["gemm_5_output"], "outputs": ["gemm_6_output"],
//!       "params": ["gemm_6_weights", "gemm_6_bias"], "scratch": ["gemm_6_scratch0"],
//!       "next": "nl_7" },
//!     ...
//!   ],
//!   "root": "conv2d_0",
//!   "inputs": ["serving_default_keras_tensor0_output"],
//!   "outputs": ["nl_7_output"]
//! }
//! ```
//!
//! A layer without `next` terminates the chain.

use std::collections::HashMap;
use std::path::Path;

use arena_mapper::ArenaLayout;
use tensor_core::{ArrayDef, Axis, QuantParams, Shape, Strides, TensorDesc};

use crate::graph::GraphState;
use crate::{
    ConvPoolConfig, LayerNode, LayerOp, LayerType, ModelError, ModelGraph, ModelInfo,
    SoftmaxConfig, TensorId,
};

/// Top-level model manifest, deserialized from `model.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub info: ModelInfo,
    pub arenas: ArenaLayout,
    pub arrays: Vec<ArrayDef>,
    pub tensors: Vec<ManifestTensor>,
    pub layers: Vec<ManifestLayer>,
    /// Name of the first layer to execute.
    pub root: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// A tensor entry. Strides default to dense channel-last.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestTensor {
    pub name: String,
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strides: Option<Strides>,
    /// Name of the backing array.
    pub array: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant: Option<QuantParams>,
    #[serde(default = "channel_axis")]
    pub quant_axis: Axis,
}

fn channel_axis() -> Axis {
    Axis::Channel
}

/// A single layer entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestLayer {
    pub id: u32,
    pub name: String,
    /// Layer type string (e.g., `"conv2d"`, `"gemm"`, `"nl"`).
    pub layer_type: String,
    /// Conv + pool parameters; defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conv: Option<ConvPoolConfig>,
    /// Softmax parameters; required for softmax layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub softmax: Option<SoftmaxConfig>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub scratch: Vec<String>,
    /// Successor layer name; `None` for the terminal layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl ManifestLayer {
    fn op(&self) -> Result<LayerOp, ModelError> {
        let kind = LayerType::from_str_loose(&self.layer_type).ok_or_else(|| {
            ModelError::InvalidLayer {
                layer: self.name.clone(),
                detail: format!("unrecognised layer type '{}'", self.layer_type),
            }
        })?;
        Ok(match kind {
            LayerType::ConvPool => LayerOp::ConvPool(self.conv.unwrap_or_default()),
            LayerType::Dense => LayerOp::Dense,
            LayerType::Softmax => LayerOp::Softmax(self.softmax.ok_or_else(|| {
                ModelError::InvalidLayer {
                    layer: self.name.clone(),
                    detail: "softmax layer without a 'softmax' parameter block".into(),
                }
            })?),
        })
    }
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Serializes the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - At least one layer is defined.
    /// - Array, tensor and layer names are unique.
    /// - All layer type strings are recognised.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::InvalidGraph("manifest contains no layers".into()));
        }
        unique("array", self.arrays.iter().map(|a| a.name.as_str()))?;
        unique("tensor", self.tensors.iter().map(|t| t.name.as_str()))?;
        unique("layer", self.layers.iter().map(|l| l.name.as_str()))?;
        for layer in &self.layers {
            layer.op()?;
        }
        Ok(())
    }

    /// Resolves every name and assembles a graph in the `Loaded` state.
    pub fn into_graph(self) -> Result<ModelGraph, ModelError> {
        self.validate()?;

        let array_ids = index_of(self.arrays.iter().map(|a| a.name.as_str()));
        let tensor_ids = index_of(self.tensors.iter().map(|t| t.name.as_str()));
        let layer_ids = index_of(self.layers.iter().map(|l| l.name.as_str()));

        let resolve = |kind: &'static str, ids: &HashMap<&str, usize>, name: &str| {
            ids.get(name).copied().ok_or_else(|| ModelError::UnknownName {
                kind,
                name: name.to_string(),
            })
        };
        let tensors_of = |names: &[String]| -> Result<Vec<TensorId>, ModelError> {
            names.iter().map(|n| resolve("tensor", &tensor_ids, n)).collect()
        };

        let mut g = ModelGraph::new(self.info.clone(), self.arenas);
        for array in &self.arrays {
            g.push_array(array.clone());
        }
        for t in &self.tensors {
            let array = resolve("array", &array_ids, &t.array)?;
            g.push_tensor(TensorDesc {
                name: t.name.clone(),
                shape: t.shape,
                strides: t.strides.unwrap_or_else(|| t.shape.strides()),
                array,
                quant: t.quant.clone(),
                quant_axis: t.quant_axis,
            });
        }
        for (i, l) in self.layers.iter().enumerate() {
            let next = match &l.next {
                Some(name) => resolve("layer", &layer_ids, name)?,
                None => i,
            };
            g.push_node(LayerNode {
                id: l.id,
                name: l.name.clone(),
                op: l.op()?,
                inputs: tensors_of(&l.inputs)?,
                outputs: tensors_of(&l.outputs)?,
                params: tensors_of(&l.params)?,
                scratch: tensors_of(&l.scratch)?,
                next,
            });
        }
        g.root = resolve("layer", &layer_ids, &self.root)?;
        g.inputs = tensors_of(&self.inputs)?;
        g.outputs = tensors_of(&self.outputs)?;
        Ok(g)
    }

    /// Describes an existing graph as a manifest.
    pub fn from_graph<S: GraphState>(graph: &ModelGraph<S>) -> Self {
        let tensor_name = |t: &TensorId| graph.tensors[*t].name.clone();
        let names = |ts: &[TensorId]| ts.iter().map(tensor_name).collect::<Vec<_>>();

        let tensors = graph
            .tensors
            .iter()
            .map(|t| ManifestTensor {
                name: t.name.clone(),
                shape: t.shape,
                strides: (t.strides != t.shape.strides()).then_some(t.strides),
                array: graph.arrays[t.array].name.clone(),
                quant: t.quant.clone(),
                quant_axis: t.quant_axis,
            })
            .collect();

        let layers = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let (conv, softmax) = match n.op {
                    LayerOp::ConvPool(c) => (Some(c), None),
                    LayerOp::Dense => (None, None),
                    LayerOp::Softmax(s) => (None, Some(s)),
                };
                ManifestLayer {
                    id: n.id,
                    name: n.name.clone(),
                    layer_type: n.op.layer_type().as_str().to_string(),
                    conv,
                    softmax,
                    inputs: names(&n.inputs),
                    outputs: names(&n.outputs),
                    params: names(&n.params),
                    scratch: names(&n.scratch),
                    next: (n.next != i).then(|| graph.nodes[n.next].name.clone()),
                }
            })
            .collect();

        Self {
            info: graph.info.clone(),
            arenas: graph.arenas,
            arrays: graph.arrays.clone(),
            tensors,
            layers,
            root: graph.nodes[graph.root].name.clone(),
            inputs: names(&graph.inputs),
            outputs: names(&graph.outputs),
        }
    }
}

fn unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<(), ModelError> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::InvalidGraph(format!("duplicate {kind} name '{name}'")));
        }
    }
    Ok(())
}

fn index_of<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    names.enumerate().map(|(i, n)| (n, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn sample_manifest_json() -> &'static str {
        r#"{
            "info": { "name": "tiny", "signature": "0x01", "datetime": "2025-01-01T00:00:00" },
            "arenas": {
                "weights": { "size_bytes": 16, "buffers": 1 },
                "activations": { "size_bytes": 64, "buffers": 1 }
            },
            "arrays": [
                { "name": "fc_w", "dtype": "i8", "len": 8, "class": "persistent", "offset": 0 },
                { "name": "fc_b", "dtype": "i32", "len": 2, "class": "persistent", "offset": 8 },
                { "name": "x", "dtype": "i8", "len": 4, "class": "transient", "offset": 0, "io": true },
                { "name": "fc_s0", "dtype": "i16", "len": 4, "class": "transient", "offset": 8 },
                { "name": "y", "dtype": "i8", "len": 2, "class": "transient", "offset": 4, "io": true }
            ],
            "tensors": [
                { "name": "fc_w", "shape": { "batch": 2, "channels": 4, "height": 1, "width": 1 },
                  "array": "fc_w", "quant_axis": "batch",
                  "quant": { "per_channel": [ { "scale": 0.01, "zero_point": 0 },
                                              { "scale": 0.02, "zero_point": 0 } ] } },
                { "name": "fc_b", "shape": { "batch": 1, "channels": 2, "height": 1, "width": 1 },
                  "array": "fc_b" },
                { "name": "x", "shape": { "batch": 1, "channels": 4, "height": 1, "width": 1 },
                  "array": "x", "quant": { "per_tensor": { "scale": 0.1, "zero_point": 0 } } },
                { "name": "fc_s0", "shape": { "batch": 1, "channels": 4, "height": 1, "width": 1 },
                  "array": "fc_s0" },
                { "name": "y", "shape": { "batch": 1, "channels": 2, "height": 1, "width": 1 },
                  "array": "y", "quant": { "per_tensor": { "scale": 0.2, "zero_point": 10 } } }
            ],
            "layers": [
                { "id": 1, "name": "fc", "layer_type": "gemm",
                  "inputs": ["x"], "outputs": ["y"],
                  "params": ["fc_w", "fc_b"], "scratch": ["fc_s0"] }
            ],
            "root": "fc",
            "inputs": ["x"],
            "outputs": ["y"]
        }"#
    }

    #[test]
    fn test_parse_and_build() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        assert!(m.validate().is_ok());
        let g = m.into_graph().unwrap().validate().unwrap();
        assert_eq!(g.num_nodes(), 1);
        assert_eq!(g.nodes[0].next, 0);
        assert_eq!(g.nodes[0].op, LayerOp::Dense);
        assert_eq!(g.tensors[2].strides, Shape::vector(4).strides());
    }

    #[test]
    fn test_unknown_tensor_name() {
        let json = sample_manifest_json().replace(r#""outputs": ["y"],"#, r#""outputs": ["z"],"#);
        let err = ModelManifest::from_json(&json).unwrap().into_graph().unwrap_err();
        assert!(matches!(err, ModelError::UnknownName { kind: "tensor", .. }), "{err}");
    }

    #[test]
    fn test_unrecognised_layer_type() {
        let json = sample_manifest_json().replace("\"gemm\"", "\"lstm\"");
        let m = ModelManifest::from_json(&json).unwrap();
        assert!(matches!(m.validate(), Err(ModelError::InvalidLayer { .. })));
    }

    #[test]
    fn test_duplicate_array_name() {
        let json = sample_manifest_json().replace(r#""name": "fc_s0", "dtype""#, r#""name": "x", "dtype""#);
        let m = ModelManifest::from_json(&json).unwrap();
        assert!(matches!(m.validate(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_softmax_requires_params() {
        let mut m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        m.layers[0].layer_type = "softmax".into();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_builtin_roundtrip() {
        let original = builtin::digit_classifier();
        let json = ModelManifest::from_graph(&original).to_json().unwrap();
        let rebuilt = ModelManifest::from_json(&json).unwrap().into_graph().unwrap();
        assert_eq!(rebuilt.arrays, original.arrays);
        assert_eq!(rebuilt.tensors, original.tensors);
        assert_eq!(rebuilt.nodes, original.nodes);
        assert_eq!(rebuilt.info, original.info);
        assert!(rebuilt.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ModelManifest::from_json("{ not json"),
            Err(ModelError::ManifestParseError(_))
        ));
    }
}
