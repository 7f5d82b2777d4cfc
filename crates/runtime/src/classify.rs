// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host-side image conversion and classification.

use std::fmt;

use tensor_core::argmax_i8;

use crate::{NetworkContext, RuntimeError};

/// Converts 8-bit grayscale pixels to the network's signed input,
/// `i8 = u8 - 128`.
///
/// Converts `min(pixels.len(), out.len())` values.
pub fn recenter_u8(pixels: &[u8], out: &mut [i8]) {
    for (o, &p) in out.iter_mut().zip(pixels) {
        *o = (p ^ 0x80) as i8;
    }
}

/// Result of one classification.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Classification {
    /// Index of the highest score; ties go to the lowest index.
    pub class: usize,
    /// Raw int8 scores.
    pub scores: Vec<i8>,
    /// Scores dequantized with the output tensor's parameters. Empty when
    /// the output is not quantized.
    pub probabilities: Vec<f32>,
}

impl Classification {
    /// Probability of the winning class, if known.
    pub fn confidence(&self) -> Option<f32> {
        self.probabilities.get(self.class).copied()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.class)?;
        if let Some(p) = self.confidence() {
            write!(f, " (p = {p:.3})")?;
        }
        Ok(())
    }
}

/// Runs `pixels` through a ready context and picks the top class.
///
/// `pixels` are unsigned and recentred before the run.
pub fn classify(ctx: &mut NetworkContext<'_>, pixels: &[u8]) -> Result<Classification, RuntimeError> {
    let output = ctx
        .outputs()
        .into_iter()
        .next()
        .ok_or_else(|| RuntimeError::InvalidParams("network has no output".into()))?;

    let mut input = vec![0i8; pixels.len()];
    recenter_u8(pixels, &mut input);
    let mut scores = vec![0i8; output.size_bytes];
    ctx.run(&input, &mut scores)?;

    let class = argmax_i8(&scores).ok_or_else(|| RuntimeError::OutputSize {
        tensor: output.name.clone(),
        expected: 1,
        actual: 0,
    })?;
    let probabilities = scores
        .iter()
        .enumerate()
        .map_while(|(i, &q)| output.dequantize(i, q))
        .collect();

    Ok(Classification {
        class,
        scores,
        probabilities,
    })
}
