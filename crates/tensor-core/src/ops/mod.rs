// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Int8 layer kernels.
//!
//! Kernels are split into phases. Each phase reads exactly one source
//! region and writes exactly one destination region (weights aside), so a
//! caller can hand every phase a disjoint pair of slices carved out of a
//! single arena. All arithmetic is integer; floating point only appears
//! when the kernel parameters are derived at graph-validation time.

mod argmax_op;
mod conv_pool_op;
mod dense_op;
mod softmax_op;

pub use argmax_op::argmax_i8;
pub use conv_pool_op::{conv2d_pool, ConvGeometry, ConvPoolKernel};
pub use dense_op::{dense, DenseKernel};
pub use softmax_op::{softmax, SoftmaxKernel, SOFTMAX_OUTPUT_ZERO_POINT};

use crate::TensorError;

/// Saturates an `i32` into the int8 range.
#[inline]
pub(crate) fn clamp_i8(v: i32) -> i8 {
    v.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8
}

/// Checks a slice length against what a phase needs.
pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}

/// Checks a scratch slice is at least `needed` bytes.
pub(crate) fn check_scratch(
    op: &'static str,
    needed: usize,
    available: usize,
) -> Result<(), TensorError> {
    if available < needed {
        return Err(TensorError::ScratchTooSmall {
            op,
            needed,
            available,
        });
    }
    Ok(())
}
