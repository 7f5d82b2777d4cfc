// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported array element formats.

/// Enumerates the element formats an array can hold.
///
/// The runtime uses `DType` to size arena regions and to decide how a
/// kernel decodes the bytes it is handed. Activations and weights are
/// `I8`; biases and softmax scratch are `I32`; dense scratch is `I16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 8-bit signed integer (quantised activations and weights).
    I8,
    /// 8-bit unsigned integer (raw host images).
    U8,
    /// 16-bit signed integer (zero-point adjusted kernel staging).
    I16,
    /// 32-bit signed integer (biases, accumulators).
    I32,
    /// 32-bit IEEE 754 floating point (dequantised host-side views).
    F32,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::I16 => 2,
            DType::I32 | DType::F32 => 4,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::I8 => "s8",
            DType::U8 => "u8",
            DType::I16 => "s16",
            DType::I32 => "s32",
            DType::F32 => "f32",
        }
    }

    /// Parses the labels produced by [`as_str`](Self::as_str), plus the
    /// common Rust spellings (`"i8"`, `"i32"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s8" | "i8" | "int8" => Some(DType::I8),
            "u8" | "uint8" => Some(DType::U8),
            "s16" | "i16" | "int16" => Some(DType::I16),
            "s32" | "i32" | "int32" => Some(DType::I32),
            "f32" | "float" | "float32" => Some(DType::F32),
            _ => None,
        }
    }

    /// Returns `true` for the integer formats.
    pub fn is_integer(self) -> bool {
        !matches!(self, DType::F32)
    }
}
