// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully connected int8 layer.

use super::{check_len, check_scratch, clamp_i8};
use crate::tensor::{load_i16, load_i32, store_i16};
use crate::{Requantizer, TensorError};

/// Precomputed parameters of one dense layer.
///
/// Weights are `[out_features][in_features]` int8, bias one little-endian
/// `i32` per output feature.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DenseKernel {
    pub in_features: usize,
    pub out_features: usize,
    pub input_zero_point: i32,
    pub output_zero_point: i32,
    /// One requantizer per output feature.
    pub requant: Vec<Requantizer>,
}

impl DenseKernel {
    /// Scratch needed to stage one input vector.
    pub fn scratch_bytes(&self) -> usize {
        self.in_features * 2
    }

    pub fn macc(&self) -> u64 {
        (self.in_features * self.out_features) as u64
    }

    /// Phase 1: stage `x - input_zero_point` as `i16`.
    pub fn stage(&self, input: &[i8], scratch0: &mut [u8]) -> Result<(), TensorError> {
        check_len(self.in_features, input.len())?;
        check_scratch("dense", self.scratch_bytes(), scratch0.len())?;
        for (i, &x) in input.iter().enumerate() {
            store_i16(scratch0, i, (i32::from(x) - self.input_zero_point) as i16);
        }
        Ok(())
    }

    /// Phase 2: accumulate, requantize and saturate into `output`.
    pub fn emit(
        &self,
        scratch0: &[u8],
        weights: &[i8],
        bias: &[u8],
        output: &mut [i8],
    ) -> Result<(), TensorError> {
        check_scratch("dense", self.scratch_bytes(), scratch0.len())?;
        check_len(self.in_features * self.out_features, weights.len())?;
        check_len(self.out_features * 4, bias.len())?;
        check_len(self.out_features, output.len())?;
        check_len(self.out_features, self.requant.len())?;

        for (o, (row, out)) in weights
            .chunks_exact(self.in_features)
            .zip(output.iter_mut())
            .enumerate()
        {
            let acc = row
                .iter()
                .enumerate()
                .fold(load_i32(bias, o), |acc, (i, &w)| {
                    acc.wrapping_add(i32::from(w) * i32::from(load_i16(scratch0, i)))
                });
            *out = clamp_i8(self.requant[o].apply(acc).saturating_add(self.output_zero_point));
        }
        Ok(())
    }
}

/// Runs both phases over disjoint buffers, one batch row at a time.
pub fn dense(
    kernel: &DenseKernel,
    input: &[i8],
    weights: &[i8],
    bias: &[u8],
    output: &mut [i8],
    scratch0: &mut [u8],
) -> Result<(), TensorError> {
    if kernel.in_features == 0 || kernel.out_features == 0 {
        return Err(TensorError::InvalidGeometry {
            op: "dense",
            detail: "feature counts must be non-zero".into(),
        });
    }
    let batch = input.len() / kernel.in_features;
    check_len(batch * kernel.in_features, input.len())?;
    check_len(batch * kernel.out_features, output.len())?;
    for (x, y) in input
        .chunks_exact(kernel.in_features)
        .zip(output.chunks_exact_mut(kernel.out_features))
    {
        kernel.stage(x, scratch0)?;
        kernel.emit(scratch0, weights, bias, y)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bias_bytes(b: &[i32]) -> Vec<u8> {
        b.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn kernel(in_f: usize, out_f: usize, in_zp: i32, out_zp: i32, scale: f64) -> DenseKernel {
        DenseKernel {
            in_features: in_f,
            out_features: out_f,
            input_zero_point: in_zp,
            output_zero_point: out_zp,
            requant: vec![Requantizer::from_scale(scale); out_f],
        }
    }

    #[test]
    fn test_dense_small() {
        // y = W (x - zp) + b, W = [[1, 2, 3], [-1, 0, 1]].
        let k = kernel(3, 2, -128, 0, 0.5);
        let x = [-127i8, -126, -125]; // x - zp = [1, 2, 3]
        let w = [1i8, 2, 3, -1, 0, 1];
        let b = bias_bytes(&[6, -2]);
        let mut y = [0i8; 2];
        let mut s = vec![0u8; k.scratch_bytes()];
        dense(&k, &x, &w, &b, &mut y, &mut s).unwrap();
        // acc0 = 14 + 6 = 20 -> 10; acc1 = 2 - 2 = 0 -> 0.
        assert_eq!(y, [10, 0]);
    }

    #[test]
    fn test_zero_weights_yield_output_zero_point() {
        let k = kernel(128, 10, -128, 44, 6.565e-4);
        let x = vec![-128i8; 128];
        let w = vec![0i8; 1280];
        let b = bias_bytes(&[0; 10]);
        let mut y = [0i8; 10];
        let mut s = vec![0u8; 356];
        dense(&k, &x, &w, &b, &mut y, &mut s).unwrap();
        assert_eq!(y, [44; 10]);
    }

    #[test]
    fn test_bias_only_shifts_one_class() {
        let k = kernel(128, 10, -128, 44, 6.565e-4);
        let x = vec![-128i8; 128];
        let w = vec![0i8; 1280];
        let mut bias = [0i32; 10];
        bias[3] = 10_000;
        let mut y = [0i8; 10];
        let mut s = vec![0u8; 256];
        dense(&k, &x, &w, &bias_bytes(&bias), &mut y, &mut s).unwrap();
        assert_eq!(y[3], 51);
        assert!(y.iter().enumerate().all(|(i, &v)| i == 3 || v == 44));
    }

    #[test]
    fn test_batch_rows() {
        let k = kernel(2, 1, 0, 0, 0.999_999_999);
        let w = [1i8, 1];
        let b = bias_bytes(&[0]);
        let mut y = [0i8; 3];
        let mut s = vec![0u8; 4];
        dense(&k, &[1, 2, 3, 4, -5, -6], &w, &b, &mut y, &mut s).unwrap();
        assert_eq!(y, [3, 7, -11]);
    }

    #[test]
    fn test_zero_point_does_not_overflow_full_scale_accumulator() {
        let full = Requantizer {
            multiplier: i32::MAX,
            shift: 0,
        };
        let mut s = vec![0u8; 2];
        for (bias, zp, want) in [(i32::MAX, 44, 127i8), (i32::MIN, -128, -128)] {
            let k = DenseKernel {
                requant: vec![full],
                ..kernel(1, 1, 0, zp, 1.0)
            };
            let mut y = [0i8; 1];
            dense(&k, &[0], &[0], &bias_bytes(&[bias]), &mut y, &mut s).unwrap();
            assert_eq!(y, [want], "bias {bias}");
        }
    }

    #[test]
    fn test_scratch_too_small() {
        let k = kernel(4, 1, 0, 0, 0.5);
        let mut s = vec![0u8; 7];
        assert!(matches!(
            k.stage(&[0; 4], &mut s),
            Err(TensorError::ScratchTooSmall { needed: 8, available: 7, .. })
        ));
    }
}
