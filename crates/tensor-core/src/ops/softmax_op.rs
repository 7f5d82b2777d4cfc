// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integer softmax over int8 rows.
//!
//! Follows the CMSIS-NN `s8` softmax: differences from the row maximum are
//! scaled into Q5.26, exponentiated in fixed point, summed with 12 bits of
//! accumulator headroom and normalised by a fixed-point reciprocal. The
//! output is quantized with scale `1/256` and zero point `-128`.

use super::{check_len, check_scratch, clamp_i8};
use crate::fixed_point::{
    doubling_high_mul, exp_on_negative_values, one_over_one_plus_x, rounding_divide_by_pot,
};
use crate::tensor::{load_i32, store_i32};
use crate::TensorError;

/// Output zero point of the int8 softmax.
pub const SOFTMAX_OUTPUT_ZERO_POINT: i32 = -128;

const ACCUM_BITS: u32 = 12;

/// Marks a column whose difference falls below `diff_min`.
const SKIPPED: i32 = i32::MIN;

/// Precomputed parameters of one softmax layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SoftmaxKernel {
    /// Number of values normalised together.
    pub row_len: usize,
    pub input_multiplier: i32,
    pub input_left_shift: i32,
    pub diff_min: i32,
}

impl SoftmaxKernel {
    /// Builds a kernel from the compiled `[multiplier, left_shift, diff_min]`
    /// parameter vector.
    pub fn from_params(row_len: usize, params: [i32; 3]) -> Result<Self, TensorError> {
        let [input_multiplier, input_left_shift, diff_min] = params;
        if !(0..31).contains(&input_left_shift) {
            return Err(TensorError::InvalidGeometry {
                op: "softmax",
                detail: format!("input left shift {input_left_shift} out of range"),
            });
        }
        if row_len == 0 {
            return Err(TensorError::InvalidGeometry {
                op: "softmax",
                detail: "empty row".into(),
            });
        }
        Ok(Self {
            row_len,
            input_multiplier,
            input_left_shift,
            diff_min,
        })
    }

    /// Scratch needed for one row: the sum plus one `i32` per column.
    pub fn scratch_bytes(&self) -> usize {
        (self.row_len + 1) * 4
    }

    fn exp_term(&self, diff: i32) -> i32 {
        let scaled = diff.saturating_mul(1 << self.input_left_shift);
        exp_on_negative_values(doubling_high_mul(scaled, self.input_multiplier))
    }

    /// Phase 1: stage the exponentials of one row and their sum.
    ///
    /// Scratch slot 0 receives the sum; slot `1 + i` the term of column `i`.
    pub fn stage(&self, row: &[i8], scratch: &mut [u8]) -> Result<(), TensorError> {
        check_len(self.row_len, row.len())?;
        check_scratch("softmax", self.scratch_bytes(), scratch.len())?;
        let max = row.iter().copied().max().map_or(0, i32::from);

        let mut sum: i32 = 0;
        for (i, &x) in row.iter().enumerate() {
            let diff = i32::from(x) - max;
            let term = if diff >= self.diff_min {
                let e = self.exp_term(diff);
                sum = sum.wrapping_add(rounding_divide_by_pot(e, ACCUM_BITS));
                e
            } else {
                SKIPPED
            };
            store_i32(scratch, i + 1, term);
        }
        store_i32(scratch, 0, sum);
        Ok(())
    }

    /// Phase 2: normalise the staged terms into int8 probabilities.
    pub fn emit(&self, scratch: &[u8], out_row: &mut [i8]) -> Result<(), TensorError> {
        check_scratch("softmax", self.scratch_bytes(), scratch.len())?;
        check_len(self.row_len, out_row.len())?;

        let sum = load_i32(scratch, 0);
        if sum <= 0 {
            return Err(TensorError::Numeric {
                op: "softmax",
                detail: format!("non-positive exponential sum {sum}"),
            });
        }
        let headroom = (sum as u32).leading_zeros();
        let normalised = ((sum as u32) << headroom) as i32;
        let shifted_scale = one_over_one_plus_x(normalised.wrapping_sub(i32::MIN));
        let bits_over_unit = ACCUM_BITS + 23 - headroom;

        for (i, out) in out_row.iter_mut().enumerate() {
            let term = load_i32(scratch, i + 1);
            *out = if term == SKIPPED {
                i8::MIN
            } else {
                let p = rounding_divide_by_pot(doubling_high_mul(shifted_scale, term), bits_over_unit);
                clamp_i8(p + SOFTMAX_OUTPUT_ZERO_POINT)
            };
        }
        Ok(())
    }
}

/// Runs softmax row by row over disjoint buffers.
pub fn softmax(
    kernel: &SoftmaxKernel,
    input: &[i8],
    output: &mut [i8],
    scratch: &mut [u8],
) -> Result<(), TensorError> {
    check_len(input.len(), output.len())?;
    if input.len() % kernel.row_len != 0 {
        return Err(TensorError::BufferSizeMismatch {
            expected: input.len().next_multiple_of(kernel.row_len),
            actual: input.len(),
        });
    }
    for (x, y) in input
        .chunks_exact(kernel.row_len)
        .zip(output.chunks_exact_mut(kernel.row_len))
    {
        kernel.stage(x, scratch)?;
        kernel.emit(scratch, y)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGIT_PARAMS: [i32; 3] = [1_811_637_632, 24, -124];

    fn run(row: &[i8]) -> Vec<i8> {
        let k = SoftmaxKernel::from_params(row.len(), DIGIT_PARAMS).unwrap();
        let mut out = vec![0i8; row.len()];
        let mut s = vec![0u8; k.scratch_bytes()];
        softmax(&k, row, &mut out, &mut s).unwrap();
        out
    }

    fn probs(out: &[i8]) -> Vec<f32> {
        out.iter().map(|&q| (i32::from(q) + 128) as f32 / 256.0).collect()
    }

    #[test]
    fn test_uniform_row() {
        let out = run(&[44; 10]);
        assert!(out.iter().all(|&v| v == out[0]));
        assert!((-103..=-101).contains(&out[0]), "got {}", out[0]);
    }

    #[test]
    fn test_sums_to_about_one() {
        let out = run(&[10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        let total: f32 = probs(&out).iter().sum();
        assert!((total - 1.0).abs() < 0.05, "sum = {total}");
    }

    #[test]
    fn test_monotonic() {
        let out = run(&[-20, 0, 20, 40]);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
        assert!(out[0] < out[3]);
    }

    #[test]
    fn test_dominant_class_saturates() {
        let out = run(&[-128, -128, 127, -128]);
        assert_eq!(out[2], 127);
        assert_eq!(out[0], -128);
    }

    #[test]
    fn test_invalid_params() {
        assert!(SoftmaxKernel::from_params(10, [1, 40, 0]).is_err());
        assert!(SoftmaxKernel::from_params(0, DIGIT_PARAMS).is_err());
    }

    #[test]
    fn test_multiple_rows() {
        let k = SoftmaxKernel::from_params(2, DIGIT_PARAMS).unwrap();
        let input = [5i8, 5, 0, 100];
        let mut out = [0i8; 4];
        let mut s = vec![0u8; k.scratch_bytes()];
        softmax(&k, &input, &mut out, &mut s).unwrap();
        assert_eq!(out[0], out[1]);
        assert!(out[3] > out[2]);
    }
}
