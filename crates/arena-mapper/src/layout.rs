// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena declarations of a compiled network.

use std::fmt;
use tensor_core::ArrayClass;

/// The two arena classes a network needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaKind {
    /// Read-only weights and biases.
    Weights,
    /// Activations and kernel scratch.
    Activations,
}

impl ArenaKind {
    /// The arena an array of `class` lives in.
    pub fn for_class(class: ArrayClass) -> Self {
        match class {
            ArrayClass::Persistent => ArenaKind::Weights,
            ArrayClass::Transient => ArenaKind::Activations,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArenaKind::Weights => "weights",
            ArenaKind::Activations => "activations",
        }
    }
}

impl fmt::Display for ArenaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared shape of one arena class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArenaDecl {
    /// Declared size of each buffer in bytes.
    pub size_bytes: usize,
    /// Number of host buffers.
    pub buffers: usize,
}

impl ArenaDecl {
    /// A single-buffer arena.
    pub fn single(size_bytes: usize) -> Self {
        Self {
            size_bytes,
            buffers: 1,
        }
    }

    /// Bytes across all buffers.
    pub fn total_bytes(&self) -> usize {
        self.size_bytes * self.buffers
    }
}

/// Weights and activations declarations together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArenaLayout {
    pub weights: ArenaDecl,
    pub activations: ArenaDecl,
}

impl ArenaLayout {
    pub fn decl(&self, kind: ArenaKind) -> &ArenaDecl {
        match kind {
            ArenaKind::Weights => &self.weights,
            ArenaKind::Activations => &self.activations,
        }
    }

    pub fn decl_mut(&mut self, kind: ArenaKind) -> &mut ArenaDecl {
        match kind {
            ArenaKind::Weights => &mut self.weights,
            ArenaKind::Activations => &mut self.activations,
        }
    }
}
