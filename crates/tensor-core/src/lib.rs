// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptors, int8 quantization and fixed-point layer kernels for
//! microcontroller-class inference.
//!
//! This crate provides:
//! - [`Shape`] / [`Strides`]: four-dimensional, channel-last descriptors.
//! - [`ArrayDef`]: a typed, fixed-length region of an arena.
//! - [`TensorDesc`]: shape, strides and quantization over an array.
//! - [`QuantParams`] / [`Requantizer`]: affine int8 quantization and its
//!   Q31 fixed-point rescaling.
//! - Phase-split kernels: fused conv + max-pool, dense and integer softmax.
//!
//! # Design Goals
//! - No floating point inside kernels.
//! - No heap allocation in kernels; callers own every buffer.
//! - Clean error types via `thiserror`.

mod array;
mod dtype;
mod error;
pub mod fixed_point;
mod ops;
mod quant;
mod shape;
mod tensor;

pub use array::{ArrayClass, ArrayDef, ArrayId};
pub use dtype::DType;
pub use error::TensorError;
pub use ops::{
    argmax_i8, conv2d_pool, dense, softmax, ConvGeometry, ConvPoolKernel, DenseKernel,
    SoftmaxKernel, SOFTMAX_OUTPUT_ZERO_POINT,
};
pub use quant::{QuantPair, QuantParams, Requantizer};
pub use shape::{Axis, Shape, Strides};
pub use tensor::{
    bytes_as_i8, bytes_as_i8_mut, decode_i32, load_i16, load_i32, store_i16, store_i32,
    TensorDesc,
};
