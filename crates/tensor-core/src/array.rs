// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backing arrays: typed, fixed-length regions inside an arena.
//!
//! An [`ArrayDef`] carries no data. It records where its bytes will live
//! once the host hands over the arenas; the binding itself is done by the
//! arena mapper.

use crate::DType;
use std::fmt;

/// Index of an array in a graph's array table.
pub type ArrayId = usize;

/// Lifetime class of an array, which also selects its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayClass {
    /// Weights and biases: live in the read-only weights arena.
    Persistent,
    /// Activations and scratch: overwritten on every inference pass.
    Transient,
}

impl ArrayClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrayClass::Persistent => "persistent",
            ArrayClass::Transient => "transient",
        }
    }
}

/// Static description of one backing array.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArrayDef {
    /// Array name (e.g. `"conv2d_0_weights"`).
    pub name: String,
    /// Element format.
    pub dtype: DType,
    /// Element count.
    pub len: usize,
    /// Persistent (weights arena) or transient (activations arena).
    pub class: ArrayClass,
    /// Index of the arena buffer this array lives in.
    #[serde(default)]
    pub buffer: usize,
    /// Byte offset inside that buffer, fixed at build time.
    pub offset: usize,
    /// Set for the model's declared input and output arrays.
    #[serde(default)]
    pub io: bool,
}

impl ArrayDef {
    /// Creates a transient array in buffer 0.
    pub fn transient(name: impl Into<String>, dtype: DType, len: usize, offset: usize) -> Self {
        Self {
            name: name.into(),
            dtype,
            len,
            class: ArrayClass::Transient,
            buffer: 0,
            offset,
            io: false,
        }
    }

    /// Creates a persistent array in buffer 0.
    pub fn persistent(name: impl Into<String>, dtype: DType, len: usize, offset: usize) -> Self {
        Self {
            name: name.into(),
            dtype,
            len,
            class: ArrayClass::Persistent,
            buffer: 0,
            offset,
            io: false,
        }
    }

    /// Marks the array as a model input or output.
    pub fn with_io(mut self) -> Self {
        self.io = true;
        self
    }

    /// Size of the array in bytes.
    pub fn size_bytes(&self) -> usize {
        self.len * self.dtype.size_bytes()
    }

    /// One past the last byte this array occupies in its buffer.
    pub fn end(&self) -> usize {
        self.offset + self.size_bytes()
    }

    /// Returns `true` if this array's bytes intersect `other`'s.
    ///
    /// Arrays in different buffers or classes never overlap.
    pub fn overlaps(&self, other: &ArrayDef) -> bool {
        self.class == other.class
            && self.buffer == other.buffer
            && self.offset < other.end()
            && other.offset < self.end()
    }
}

impl fmt::Display for ArrayDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} @{}+{} ({})",
            self.name,
            self.dtype.as_str(),
            self.len,
            self.offset,
            self.size_bytes(),
            self.class.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_end() {
        let a = ArrayDef::transient("gemm_5_scratch0", DType::I16, 1440, 800);
        assert_eq!(a.size_bytes(), 2880);
        assert_eq!(a.end(), 3680);
    }

    #[test]
    fn test_overlaps() {
        let a = ArrayDef::transient("a", DType::I8, 100, 0);
        let b = ArrayDef::transient("b", DType::I8, 100, 99);
        let c = ArrayDef::transient("c", DType::I8, 100, 100);
        let w = ArrayDef::persistent("w", DType::I8, 100, 0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&w));
    }

    #[test]
    fn test_display() {
        let a = ArrayDef::persistent("conv2d_0_bias", DType::I32, 16, 144);
        assert_eq!(format!("{a}"), "conv2d_0_bias s32x16 @144+64 (persistent)");
    }
}
