// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! A static intermediate representation (IR) for compiled, int8-quantized
//! convolutional networks.
//!
//! A compiled network is a set of flat tables linked by index:
//!
//! - [`ArrayDef`](tensor_core::ArrayDef)s: typed regions at fixed arena offsets.
//! - [`TensorDesc`](tensor_core::TensorDesc)s: shapes and quantization over arrays.
//! - [`LayerNode`]s: operations linked into a chain through `next`.
//! - [`ModelGraph`]: the tables together, with a **type-state pattern**
//!   (`Loaded` → `Validated`); validation precomputes one [`Kernel`] per node.
//! - [`ModelLoader`] / [`ModelManifest`]: the JSON manifest format.
//! - [`builtin::digit_classifier`]: the compiled 28x28 digit classifier.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//!
//! let graph = ModelLoader::builtin().unwrap();
//! println!("{}", graph.summary());
//! for (_, node) in graph.chain() {
//!     println!("  {}", node.summary());
//! }
//! ```

pub mod builtin;
mod error;
pub mod graph;
mod info;
mod kernel;
mod layer;
mod loader;
mod manifest;

pub use error::ModelError;
pub use graph::ModelGraph;
pub use info::ModelInfo;
pub use kernel::Kernel;
pub use layer::{ConvPoolConfig, LayerNode, LayerOp, LayerType, SoftmaxConfig, TensorId};
pub use loader::ModelLoader;
pub use manifest::{ManifestLayer, ManifestTensor, ModelManifest};
