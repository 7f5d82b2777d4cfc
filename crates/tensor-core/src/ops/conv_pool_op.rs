// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fused 2-D convolution + max-pool over channel-last int8 tensors.
//!
//! The kernel produces one pooled output row at a time:
//!
//! 1. [`ConvPoolKernel::load_window`] copies the input rows the pooled row
//!    depends on into scratch 0 as zero-point adjusted `i16`.
//! 2. [`ConvPoolKernel::conv_rows`] computes `pool_h` convolution rows from
//!    scratch 0 into scratch 1 as requantized `i8`.
//! 3. [`ConvPoolKernel::pool_row`] max-pools scratch 1 into the output row.
//!
//! Because the input window is fully copied before the output row is
//! written, the output may overwrite input rows that no later pooled row
//! needs.

use std::ops::Range;

use super::{check_len, check_scratch, clamp_i8};
use crate::tensor::{bytes_as_i8, load_i16, load_i32, store_i16};
use crate::{Requantizer, TensorError};

/// Static geometry of a valid-padding conv + max-pool layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConvGeometry {
    pub batch: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub in_c: usize,
    pub out_c: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub dilation_h: usize,
    pub dilation_w: usize,
    pub pool_h: usize,
    pub pool_w: usize,
    pub pool_stride_h: usize,
    pub pool_stride_w: usize,
}

impl ConvGeometry {
    /// Checks that every extent is non-zero and that kernel and pool
    /// windows fit inside their inputs.
    pub fn validate(&self) -> Result<(), TensorError> {
        let fields = [
            ("batch", self.batch),
            ("in_h", self.in_h),
            ("in_w", self.in_w),
            ("in_c", self.in_c),
            ("out_c", self.out_c),
            ("kernel_h", self.kernel_h),
            ("kernel_w", self.kernel_w),
            ("stride_h", self.stride_h),
            ("stride_w", self.stride_w),
            ("dilation_h", self.dilation_h),
            ("dilation_w", self.dilation_w),
            ("pool_h", self.pool_h),
            ("pool_w", self.pool_w),
            ("pool_stride_h", self.pool_stride_h),
            ("pool_stride_w", self.pool_stride_w),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| *v == 0) {
            return Err(invalid(format!("{name} must be non-zero")));
        }
        let eff_h = (self.kernel_h - 1) * self.dilation_h + 1;
        let eff_w = (self.kernel_w - 1) * self.dilation_w + 1;
        if eff_h > self.in_h || eff_w > self.in_w {
            return Err(invalid(format!(
                "kernel {}x{} (dilated {eff_h}x{eff_w}) exceeds input {}x{}",
                self.kernel_h, self.kernel_w, self.in_h, self.in_w
            )));
        }
        if self.pool_h > self.conv_h() || self.pool_w > self.conv_w() {
            return Err(invalid(format!(
                "pool {}x{} exceeds conv output {}x{}",
                self.pool_h,
                self.pool_w,
                self.conv_h(),
                self.conv_w()
            )));
        }
        Ok(())
    }

    pub fn conv_h(&self) -> usize {
        (self.in_h - ((self.kernel_h - 1) * self.dilation_h + 1)) / self.stride_h + 1
    }

    pub fn conv_w(&self) -> usize {
        (self.in_w - ((self.kernel_w - 1) * self.dilation_w + 1)) / self.stride_w + 1
    }

    pub fn pooled_h(&self) -> usize {
        (self.conv_h() - self.pool_h) / self.pool_stride_h + 1
    }

    pub fn pooled_w(&self) -> usize {
        (self.conv_w() - self.pool_w) / self.pool_stride_w + 1
    }

    /// Input rows one pooled row depends on.
    pub fn window_rows(&self) -> usize {
        (self.pool_h - 1) * self.stride_h + (self.kernel_h - 1) * self.dilation_h + 1
    }

    /// Bytes in one input row (`in_w * in_c` int8 values).
    pub fn in_row_bytes(&self) -> usize {
        self.in_w * self.in_c
    }

    /// Bytes in one pooled output row.
    pub fn out_row_bytes(&self) -> usize {
        self.pooled_w() * self.out_c
    }

    /// First input row (within one batch item) read by pooled row `r`.
    pub fn first_input_row(&self, r: usize) -> usize {
        r * self.pool_stride_h * self.stride_h
    }

    /// Byte range of the input window of pooled row `r` of batch item `b`,
    /// relative to the start of the input tensor.
    pub fn input_window(&self, b: usize, r: usize) -> Range<usize> {
        let row = b * self.in_h + self.first_input_row(r);
        let start = row * self.in_row_bytes();
        start..start + self.window_rows() * self.in_row_bytes()
    }

    /// Byte range of pooled row `r` of batch item `b`, relative to the start
    /// of the output tensor.
    pub fn output_row(&self, b: usize, r: usize) -> Range<usize> {
        let start = (b * self.pooled_h() + r) * self.out_row_bytes();
        start..start + self.out_row_bytes()
    }

    /// Scratch 0 size: the staged `i16` input window.
    pub fn scratch0_bytes(&self) -> usize {
        self.window_rows() * self.in_row_bytes() * 2
    }

    /// Scratch 1 size: `pool_h` requantized conv rows.
    pub fn scratch1_bytes(&self) -> usize {
        self.pool_h * self.conv_w() * self.out_c
    }

    pub fn weight_len(&self) -> usize {
        self.out_c * self.kernel_h * self.kernel_w * self.in_c
    }

    pub fn input_len(&self) -> usize {
        self.batch * self.in_h * self.in_row_bytes()
    }

    pub fn output_len(&self) -> usize {
        self.batch * self.pooled_h() * self.out_row_bytes()
    }

    /// Multiply-accumulates of the convolution part.
    pub fn macc(&self) -> u64 {
        (self.batch * self.conv_h() * self.conv_w()) as u64 * self.weight_len() as u64
    }
}

fn invalid(detail: String) -> TensorError {
    TensorError::InvalidGeometry {
        op: "conv_pool",
        detail,
    }
}

/// Precomputed parameters of one conv + pool layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConvPoolKernel {
    pub geometry: ConvGeometry,
    pub input_zero_point: i32,
    pub output_zero_point: i32,
    /// One requantizer per output channel.
    pub requant: Vec<Requantizer>,
}

impl ConvPoolKernel {
    /// Phase 1: stage the input window as `x - input_zero_point`.
    pub fn load_window(&self, window: &[i8], scratch0: &mut [u8]) -> Result<(), TensorError> {
        let g = &self.geometry;
        check_len(g.window_rows() * g.in_row_bytes(), window.len())?;
        check_scratch("conv_pool", g.scratch0_bytes(), scratch0.len())?;
        for (i, &x) in window.iter().enumerate() {
            store_i16(scratch0, i, (i32::from(x) - self.input_zero_point) as i16);
        }
        Ok(())
    }

    /// Phase 2: compute `pool_h` conv rows from the staged window.
    ///
    /// `weights` is OHWI, `bias` holds one little-endian `i32` per output
    /// channel.
    pub fn conv_rows(
        &self,
        scratch0: &[u8],
        weights: &[i8],
        bias: &[u8],
        scratch1: &mut [u8],
    ) -> Result<(), TensorError> {
        let g = &self.geometry;
        check_scratch("conv_pool", g.scratch0_bytes(), scratch0.len())?;
        check_scratch("conv_pool", g.scratch1_bytes(), scratch1.len())?;
        check_len(g.weight_len(), weights.len())?;
        check_len(g.out_c * 4, bias.len())?;
        check_len(g.out_c, self.requant.len())?;

        let conv_w = g.conv_w();
        let k_row = g.kernel_w * g.in_c;
        let k_len = g.kernel_h * k_row;

        for j in 0..g.pool_h {
            for ox in 0..conv_w {
                let dst = (j * conv_w + ox) * g.out_c;
                for oc in 0..g.out_c {
                    let w_oc = &weights[oc * k_len..(oc + 1) * k_len];
                    let mut acc = load_i32(bias, oc);
                    for ky in 0..g.kernel_h {
                        let y = j * g.stride_h + ky * g.dilation_h;
                        for kx in 0..g.kernel_w {
                            let x = ox * g.stride_w + kx * g.dilation_w;
                            let src = (y * g.in_w + x) * g.in_c;
                            let w = &w_oc[ky * k_row + kx * g.in_c..][..g.in_c];
                            for (ic, &wv) in w.iter().enumerate() {
                                acc = acc.wrapping_add(
                                    i32::from(wv) * i32::from(load_i16(scratch0, src + ic)),
                                );
                            }
                        }
                    }
                    let out = self.requant[oc].apply(acc).saturating_add(self.output_zero_point);
                    scratch1[dst + oc] = clamp_i8(out) as u8;
                }
            }
        }
        Ok(())
    }

    /// Phase 3: max-pool the conv rows into one output row.
    pub fn pool_row(&self, scratch1: &[u8], out_row: &mut [i8]) -> Result<(), TensorError> {
        let g = &self.geometry;
        check_scratch("conv_pool", g.scratch1_bytes(), scratch1.len())?;
        check_len(g.out_row_bytes(), out_row.len())?;
        let conv = bytes_as_i8(scratch1);
        let conv_w = g.conv_w();

        for px in 0..g.pooled_w() {
            for oc in 0..g.out_c {
                let mut m = i8::MIN;
                for py in 0..g.pool_h {
                    for kx in 0..g.pool_w {
                        let cx = px * g.pool_stride_w + kx;
                        m = m.max(conv[(py * conv_w + cx) * g.out_c + oc]);
                    }
                }
                out_row[px * g.out_c + oc] = m;
            }
        }
        Ok(())
    }
}

/// Runs every phase of a conv + pool layer over disjoint buffers.
pub fn conv2d_pool(
    kernel: &ConvPoolKernel,
    input: &[i8],
    weights: &[i8],
    bias: &[u8],
    output: &mut [i8],
    scratch0: &mut [u8],
    scratch1: &mut [u8],
) -> Result<(), TensorError> {
    let g = &kernel.geometry;
    g.validate()?;
    check_len(g.input_len(), input.len())?;
    check_len(g.output_len(), output.len())?;
    for b in 0..g.batch {
        for r in 0..g.pooled_h() {
            kernel.load_window(&input[g.input_window(b, r)], scratch0)?;
            kernel.conv_rows(scratch0, weights, bias, scratch1)?;
            kernel.pool_row(scratch1, &mut output[g.output_row(b, r)])?;
        }
    }
    Ok(())
}
