// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Kernel parameters derived at validation time.
//!
//! Everything that needs floating point (requantization multipliers) is
//! computed here once, so execution stays integer-only.

use tensor_core::{ConvGeometry, ConvPoolKernel, DenseKernel, SoftmaxKernel};

/// Precomputed kernel for one node, in node-arena order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    ConvPool(ConvPoolKernel),
    Dense(DenseKernel),
    Softmax(SoftmaxKernel),
}

impl Kernel {
    /// Multiply-accumulate count.
    pub fn macc(&self) -> u64 {
        match self {
            Kernel::ConvPool(k) => k.geometry.macc(),
            Kernel::Dense(k) => k.macc(),
            Kernel::Softmax(k) => k.row_len as u64,
        }
    }

    /// Scratch bytes each scratch slot needs, in slot order.
    pub fn scratch_bytes(&self) -> Vec<usize> {
        match self {
            Kernel::ConvPool(k) => vec![k.geometry.scratch0_bytes(), k.geometry.scratch1_bytes()],
            Kernel::Dense(k) => vec![k.scratch_bytes()],
            Kernel::Softmax(k) => vec![k.scratch_bytes()],
        }
    }

    pub fn geometry(&self) -> Option<&ConvGeometry> {
        match self {
            Kernel::ConvPool(k) => Some(&k.geometry),
            _ => None,
        }
    }
}
