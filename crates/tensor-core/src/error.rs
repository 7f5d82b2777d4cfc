// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor descriptors and kernels.

use crate::Shape;

/// Errors that can occur while describing tensors or running kernels.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A buffer is not the size the shape and dtype require.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype:?} for operation {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },

    /// Quantization parameters are malformed (bad scale, wrong count).
    #[error("invalid quantization for '{tensor}': {detail}")]
    InvalidQuant { tensor: String, detail: String },

    /// A tensor addresses elements past the end of its backing array.
    #[error("tensor '{tensor}' spans {span} elements but its array holds {len}")]
    OutOfBounds {
        tensor: String,
        span: usize,
        len: usize,
    },

    /// A kernel was handed less scratch memory than it needs.
    #[error("{op} needs {needed} bytes of scratch, got {available}")]
    ScratchTooSmall {
        op: &'static str,
        needed: usize,
        available: usize,
    },

    /// Kernel geometry does not produce a valid output (e.g. kernel larger
    /// than input).
    #[error("invalid geometry for {op}: {detail}")]
    InvalidGeometry { op: &'static str, detail: String },

    /// The source and destination of a kernel phase share bytes.
    #[error("{op}: source {src:?} overlaps destination {dst:?}")]
    Overlap {
        op: &'static str,
        src: std::ops::Range<usize>,
        dst: std::ops::Range<usize>,
    },

    /// A numeric computation failed (e.g., NaN or overflow).
    #[error("numeric error in {op}: {detail}")]
    Numeric { op: &'static str, detail: String },
}
