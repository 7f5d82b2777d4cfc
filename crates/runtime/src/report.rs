// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Descriptions of a network's I/O and identity for hosts.

use std::fmt;

use arena_mapper::ArenaDecl;
use model_ir::{graph::Validated, ModelGraph, TensorId};
use tensor_core::{DType, QuantParams, Shape};

/// What a host needs to size and interpret one I/O buffer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IoInfo {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub quant: Option<QuantParams>,
    /// Bytes the host buffer must hold.
    pub size_bytes: usize,
}

impl IoInfo {
    pub fn from_tensor(graph: &ModelGraph<Validated>, t: TensorId) -> Self {
        let desc = &graph.tensors[t];
        Self {
            name: desc.name.clone(),
            dtype: graph.array_of(t).dtype,
            shape: desc.shape,
            quant: desc.quant.clone(),
            size_bytes: graph.tensor_bytes(t),
        }
    }

    /// Real value of element `i` holding `q`, when the tensor is quantized.
    pub fn dequantize(&self, i: usize, q: i8) -> Option<f32> {
        let quant = self.quant.as_ref()?;
        let c = if quant.len() == 1 { 0 } else { i % quant.len() };
        Some(quant.dequantize(c, q))
    }
}

impl fmt::Display for IoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {} {} ({} B)", self.name, self.dtype.as_str(), self.shape, self.size_bytes)?;
        if let Some(p) = self.quant.as_ref().and_then(QuantParams::uniform) {
            write!(f, " scale={} zp={}", p.scale, p.zero_point)?;
        }
        Ok(())
    }
}

/// Identity and resource summary of a created network.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkReport {
    pub model_name: String,
    pub model_signature: String,
    pub model_datetime: String,
    pub numeric_signature: u32,
    pub n_macc: u64,
    pub n_nodes: usize,
    pub inputs: Vec<IoInfo>,
    pub outputs: Vec<IoInfo>,
    pub weights: ArenaDecl,
    pub activations: ArenaDecl,
    pub runtime_version: &'static str,
}

impl NetworkReport {
    pub fn new(graph: &ModelGraph<Validated>) -> Self {
        let info = &graph.info;
        Self {
            model_name: info.name.clone(),
            model_signature: info.signature.clone(),
            model_datetime: info.datetime.clone(),
            numeric_signature: info.numeric_signature,
            n_macc: info.n_macc,
            n_nodes: graph.num_nodes(),
            inputs: graph.inputs.iter().map(|&t| IoInfo::from_tensor(graph, t)).collect(),
            outputs: graph.outputs.iter().map(|&t| IoInfo::from_tensor(graph, t)).collect(),
            weights: graph.arenas.weights,
            activations: graph.arenas.activations,
            runtime_version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Network '{}' ({:#010x}): {} node(s), {} MACC, weights {} B, activations {} B",
            self.model_name,
            self.numeric_signature,
            self.n_nodes,
            self.n_macc,
            self.weights.total_bytes(),
            self.activations.total_bytes(),
        )
    }
}

impl NetworkReport {
    /// Serialises the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for NetworkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        writeln!(f, "  signature : {}", self.model_signature)?;
        writeln!(f, "  generated : {}", self.model_datetime)?;
        writeln!(f, "  runtime   : {}", self.runtime_version)?;
        for io in &self.inputs {
            writeln!(f, "  input     : {io}")?;
        }
        for io in &self.outputs {
            writeln!(f, "  output    : {io}")?;
        }
        Ok(())
    }
}
