// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and graph validation.

use tensor_core::TensorError;

/// Errors that can occur when building or validating a network graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model manifest file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// A name in the manifest does not resolve to a declared entity.
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },

    /// An array declaration is inconsistent with its arena.
    #[error("invalid array '{array}': {detail}")]
    InvalidArray { array: String, detail: String },

    /// A tensor descriptor does not fit its array or carries bad quantization.
    #[error("invalid tensor '{tensor}': {source}")]
    InvalidTensor {
        tensor: String,
        #[source]
        source: TensorError,
    },

    /// A layer node is invalid (e.g., incompatible shapes).
    #[error("invalid layer '{layer}': {detail}")]
    InvalidLayer { layer: String, detail: String },

    /// A layer asks for something the kernels do not implement.
    #[error("unsupported layer '{layer}': {detail}")]
    Unsupported { layer: String, detail: String },

    /// Kernel parameters could not be derived for a layer.
    #[error("layer '{layer}': {source}")]
    Kernel {
        layer: String,
        #[source]
        source: TensorError,
    },

    /// The layer chain is cyclic, empty or otherwise malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),
}
