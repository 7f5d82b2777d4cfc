// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for arena binding.

use crate::ArenaKind;

/// Errors that can occur while binding arrays onto host arenas.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The host supplied a different number of buffers than declared.
    #[error("{kind} arena: expected {expected} buffer(s), got {actual}")]
    BufferCountMismatch {
        kind: ArenaKind,
        expected: usize,
        actual: usize,
    },

    /// A host buffer is smaller than its declared size.
    #[error("{kind} arena buffer {buffer}: needs {required} bytes, got {actual}")]
    BufferTooSmall {
        kind: ArenaKind,
        buffer: usize,
        required: usize,
        actual: usize,
    },

    /// An array refers to a buffer index the arena does not have.
    #[error("array '{array}' refers to {kind} buffer {buffer}, but only {buffers} exist")]
    UnknownBuffer {
        array: String,
        kind: ArenaKind,
        buffer: usize,
        buffers: usize,
    },

    /// An array's byte range does not fit inside its buffer.
    #[error("array '{array}' ends at byte {end}, past the {len}-byte {kind} buffer {buffer}")]
    ArrayOutOfBounds {
        array: String,
        kind: ArenaKind,
        buffer: usize,
        end: usize,
        len: usize,
    },

    /// A size string could not be parsed.
    #[error("invalid size '{0}': expected a number with an optional K/M/G suffix")]
    InvalidSize(String),
}
