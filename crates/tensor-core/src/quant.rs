// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Affine int8 quantization: `real = scale * (q - zero_point)`.

use crate::fixed_point::{doubling_high_mul, rounding_divide_by_pot};
use crate::TensorError;

/// One `(scale, zero_point)` pair.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuantPair {
    pub scale: f32,
    pub zero_point: i8,
}

impl QuantPair {
    pub fn new(scale: f32, zero_point: i8) -> Self {
        Self { scale, zero_point }
    }

    /// Maps a real value to int8, rounding half away from zero and
    /// saturating to `[-128, 127]`.
    pub fn quantize(&self, real: f32) -> i8 {
        let q = (real / self.scale).round() + f32::from(self.zero_point);
        q.clamp(f32::from(i8::MIN), f32::from(i8::MAX)) as i8
    }

    /// Maps an int8 value back to the real domain.
    pub fn dequantize(&self, q: i8) -> f32 {
        self.scale * (i32::from(q) - i32::from(self.zero_point)) as f32
    }
}

/// Quantization parameters of a tensor: one pair for the whole tensor, or
/// one pair per slice along the tensor's quantization axis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantParams {
    PerTensor(QuantPair),
    PerChannel(Vec<QuantPair>),
}

impl QuantParams {
    pub fn per_tensor(scale: f32, zero_point: i8) -> Self {
        QuantParams::PerTensor(QuantPair::new(scale, zero_point))
    }

    /// Per-channel parameters sharing one zero point.
    pub fn per_channel(scales: &[f32], zero_point: i8) -> Self {
        QuantParams::PerChannel(
            scales
                .iter()
                .map(|&s| QuantPair::new(s, zero_point))
                .collect(),
        )
    }

    /// Number of `(scale, zero_point)` pairs.
    pub fn len(&self) -> usize {
        match self {
            QuantParams::PerTensor(_) => 1,
            QuantParams::PerChannel(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pair governing channel `c`. A per-tensor pair governs every channel.
    ///
    /// # Panics
    /// Panics if `c` is out of range for per-channel parameters; callers
    /// validate the count against the tensor first.
    pub fn pair(&self, c: usize) -> QuantPair {
        match self {
            QuantParams::PerTensor(p) => *p,
            QuantParams::PerChannel(pairs) => pairs[c],
        }
    }

    /// Returns the single pair if these are per-tensor parameters, or if
    /// every per-channel pair is identical.
    pub fn uniform(&self) -> Option<QuantPair> {
        match self {
            QuantParams::PerTensor(p) => Some(*p),
            QuantParams::PerChannel(pairs) => {
                let first = *pairs.first()?;
                pairs.iter().all(|p| *p == first).then_some(first)
            }
        }
    }

    /// Checks that there are either one pair or exactly `extent` pairs and
    /// that every scale is finite and positive.
    pub fn validate(&self, tensor: &str, extent: usize) -> Result<(), TensorError> {
        let n = self.len();
        if n != 1 && n != extent {
            return Err(TensorError::InvalidQuant {
                tensor: tensor.to_string(),
                detail: format!("{n} quantization pairs for an axis of extent {extent}"),
            });
        }
        let pairs: &[QuantPair] = match self {
            QuantParams::PerTensor(p) => std::slice::from_ref(p),
            QuantParams::PerChannel(pairs) => pairs,
        };
        if let Some((i, bad)) = pairs
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.scale.is_finite() && p.scale > 0.0))
        {
            return Err(TensorError::InvalidQuant {
                tensor: tensor.to_string(),
                detail: format!("scale[{i}] = {} is not a positive finite number", bad.scale),
            });
        }
        Ok(())
    }

    pub fn quantize(&self, c: usize, real: f32) -> i8 {
        self.pair(c).quantize(real)
    }

    pub fn dequantize(&self, c: usize, q: i8) -> f32 {
        self.pair(c).dequantize(q)
    }
}

/// A real multiplier expressed as a Q31 fixed-point mantissa and a
/// power-of-two exponent: `real ≈ multiplier * 2^(shift - 31)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Requantizer {
    pub multiplier: i32,
    pub shift: i32,
}

impl Requantizer {
    /// Requantizer that maps every accumulator to zero.
    pub const ZERO: Requantizer = Requantizer {
        multiplier: 0,
        shift: 0,
    };

    /// Decomposes a non-negative real multiplier.
    ///
    /// Multipliers too small to be represented (exponent below `-31`)
    /// collapse to [`Requantizer::ZERO`].
    pub fn from_scale(real: f64) -> Self {
        if !(real.is_finite() && real > 0.0) {
            return Self::ZERO;
        }
        let (mantissa, mut shift) = frexp(real);
        let mut q_fixed = (mantissa * (1i64 << 31) as f64).round() as i64;
        if q_fixed == 1i64 << 31 {
            q_fixed /= 2;
            shift += 1;
        }
        if shift < -31 {
            return Self::ZERO;
        }
        Self {
            multiplier: q_fixed as i32,
            shift,
        }
    }

    /// Builds the requantizer for `acc * in_scale * w_scale / out_scale`.
    pub fn for_layer(in_scale: f32, w_scale: f32, out_scale: f32) -> Self {
        Self::from_scale(f64::from(in_scale) * f64::from(w_scale) / f64::from(out_scale))
    }

    /// Scales an int32 accumulator.
    #[inline]
    pub fn apply(&self, acc: i32) -> i32 {
        let left = self.shift.max(0) as u32;
        let right = (-self.shift).max(0) as u32;
        let shifted = acc.saturating_mul(1i32 << left.min(30));
        rounding_divide_by_pot(doubling_high_mul(shifted, self.multiplier), right)
    }

    /// The real multiplier this requantizer approximates.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.multiplier) * 2f64.powi(self.shift - 31)
    }
}

/// Splits a positive finite `x` into `m * 2^e` with `m` in `[0.5, 1)`.
fn frexp(x: f64) -> (f64, i32) {
    let mut m = x;
    let mut e = 0;
    while m >= 1.0 {
        m /= 2.0;
        e += 1;
    }
    while m < 0.5 {
        m *= 2.0;
        e -= 1;
    }
    (m, e)
}
