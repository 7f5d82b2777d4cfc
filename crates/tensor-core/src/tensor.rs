// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor descriptors and byte-level views.
//!
//! A [`TensorDesc`] never owns data. It names a backing array and states
//! how to address it: shape, strides and quantization. Several descriptors
//! may share one array (a flatten is just a second descriptor).

use crate::{ArrayDef, ArrayId, Axis, QuantParams, Shape, Strides, TensorError};

/// Static description of one tensor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorDesc {
    pub name: String,
    pub shape: Shape,
    pub strides: Strides,
    /// Index into the graph's array table.
    pub array: ArrayId,
    /// Absent for biases and scratch buffers.
    #[serde(default)]
    pub quant: Option<QuantParams>,
    /// Axis along which per-channel parameters apply.
    pub quant_axis: Axis,
}

impl TensorDesc {
    /// Creates a dense channel-last activation tensor quantized per tensor.
    pub fn activation(
        name: impl Into<String>,
        shape: Shape,
        array: ArrayId,
        scale: f32,
        zero_point: i8,
    ) -> Self {
        Self {
            name: name.into(),
            shape,
            strides: shape.strides(),
            array,
            quant: Some(QuantParams::per_tensor(scale, zero_point)),
            quant_axis: Axis::Channel,
        }
    }

    /// Creates a dense tensor without quantization (bias, scratch).
    pub fn plain(name: impl Into<String>, shape: Shape, array: ArrayId) -> Self {
        Self {
            name: name.into(),
            shape,
            strides: shape.strides(),
            array,
            quant: None,
            quant_axis: Axis::Channel,
        }
    }

    /// Creates a dense tensor with explicit quantization on `quant_axis`.
    pub fn with_quant(
        name: impl Into<String>,
        shape: Shape,
        array: ArrayId,
        quant: QuantParams,
        quant_axis: Axis,
    ) -> Self {
        Self {
            name: name.into(),
            shape,
            strides: shape.strides(),
            array,
            quant: Some(quant),
            quant_axis,
        }
    }

    /// Number of elements described.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Number of array elements addressed by this descriptor.
    pub fn span(&self) -> usize {
        self.strides.span(&self.shape)
    }

    /// Checks the descriptor against its backing array.
    ///
    /// # Errors
    /// - [`TensorError::OutOfBounds`] if the strides address elements past the
    ///   end of `array`.
    /// - [`TensorError::InvalidQuant`] if present quantization parameters
    ///   count neither one pair nor the extent of the quantization axis, or a
    ///   scale is not positive.
    pub fn validate(&self, array: &ArrayDef) -> Result<(), TensorError> {
        let span = self.span();
        if span > array.len {
            return Err(TensorError::OutOfBounds {
                tensor: self.name.clone(),
                span,
                len: array.len,
            });
        }
        match &self.quant {
            Some(q) => q.validate(&self.name, self.shape.dim(self.quant_axis)),
            None => Ok(()),
        }
    }

    /// Returns the quantization parameters or an error naming the tensor.
    pub fn require_quant(&self) -> Result<&QuantParams, TensorError> {
        self.quant.as_ref().ok_or_else(|| TensorError::InvalidQuant {
            tensor: self.name.clone(),
            detail: "quantization parameters required".into(),
        })
    }
}

// ── Byte views ─────────────────────────────────────────────────────────────
//
// Arena memory is handed over as raw bytes with no alignment guarantee, so
// wider element types are decoded little-endian instead of reinterpreted.

/// Reinterprets bytes as signed 8-bit values.
pub fn bytes_as_i8(bytes: &[u8]) -> &[i8] {
    // SAFETY: i8 and u8 have identical size and alignment and every bit
    // pattern is valid for both.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const i8, bytes.len()) }
}

/// Reinterprets bytes as mutable signed 8-bit values.
pub fn bytes_as_i8_mut(bytes: &mut [u8]) -> &mut [i8] {
    // SAFETY: see `bytes_as_i8`; the exclusive borrow is carried over.
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut i8, bytes.len()) }
}

/// Reads the `i`-th little-endian `i16`.
#[inline]
pub fn load_i16(bytes: &[u8], i: usize) -> i16 {
    i16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]])
}

/// Writes the `i`-th little-endian `i16`.
#[inline]
pub fn store_i16(bytes: &mut [u8], i: usize, v: i16) {
    bytes[2 * i..2 * i + 2].copy_from_slice(&v.to_le_bytes());
}

/// Reads the `i`-th little-endian `i32`.
#[inline]
pub fn load_i32(bytes: &[u8], i: usize) -> i32 {
    let b = &bytes[4 * i..4 * i + 4];
    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Writes the `i`-th little-endian `i32`.
#[inline]
pub fn store_i32(bytes: &mut [u8], i: usize, v: i32) {
    bytes[4 * i..4 * i + 4].copy_from_slice(&v.to_le_bytes());
}

/// Decodes a whole little-endian `i32` array.
pub fn decode_i32(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_validate_ok() {
        let arr = ArrayDef::transient("conv2d_2_output", DType::I8, 800, 0);
        let t = TensorDesc::activation("conv2d_2_output", Shape::new(1, 32, 5, 5), 0, 0.0147, -128);
        assert!(t.validate(&arr).is_ok());
        // A flattened view of the same array is also in bounds.
        let flat = TensorDesc::activation("conv2d_2_flat", Shape::vector(800), 0, 0.0147, -128);
        assert!(flat.validate(&arr).is_ok());
    }

    #[test]
    fn test_validate_out_of_bounds() {
        let arr = ArrayDef::transient("small", DType::I8, 100, 0);
        let t = TensorDesc::activation("big", Shape::vector(101), 0, 0.1, 0);
        assert!(matches!(
            t.validate(&arr),
            Err(TensorError::OutOfBounds { span: 101, len: 100, .. })
        ));
    }

    #[test]
    fn test_validate_quant_count() {
        let arr = ArrayDef::persistent("w", DType::I8, 144, 0);
        let t = TensorDesc::with_quant(
            "w",
            Shape::new(16, 1, 3, 3),
            0,
            QuantParams::per_channel(&[0.1; 15], 0),
            Axis::Batch,
        );
        assert!(matches!(t.validate(&arr), Err(TensorError::InvalidQuant { .. })));
    }

    #[test]
    fn test_plain_tensor_has_no_quant() {
        let arr = ArrayDef::persistent("conv2d_0_bias", DType::I32, 16, 144);
        let t = TensorDesc::plain("conv2d_0_bias", Shape::vector(16), 0);
        assert!(t.validate(&arr).is_ok());
        assert!(t.require_quant().is_err());
    }

    #[test]
    fn test_le_helpers() {
        let mut buf = [0u8; 12];
        store_i32(&mut buf, 1, -123_456);
        store_i16(&mut buf, 5, -300);
        assert_eq!(load_i32(&buf, 1), -123_456);
        assert_eq!(load_i16(&buf, 5), -300);
        assert_eq!(decode_i32(&buf[..8]), vec![0, -123_456]);
    }

    #[test]
    fn test_i8_views() {
        let mut buf = [0x80u8, 0x7f, 0xff];
        assert_eq!(bytes_as_i8(&buf), &[-128, 127, -1]);
        bytes_as_i8_mut(&mut buf)[2] = -2;
        assert_eq!(buf[2], 0xfe);
    }
}
