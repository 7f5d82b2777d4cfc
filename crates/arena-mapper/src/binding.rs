// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resolved array locations.

use std::ops::Range;

use crate::ArenaKind;
use tensor_core::ArrayId;

/// Where one array's bytes live once the host arenas are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Binding {
    pub kind: ArenaKind,
    /// Host buffer index within the arena.
    pub buffer: usize,
    /// Byte offset inside that buffer.
    pub offset: usize,
    pub len_bytes: usize,
    /// Set for weights: the bytes must never be written.
    pub constant: bool,
}

impl Binding {
    /// Byte range inside the host buffer.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len_bytes
    }
}

/// Bindings for every array of one arena kind, indexed by [`ArrayId`].
///
/// Arrays of the other kind have no entry.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BindingTable {
    slots: Vec<Option<Binding>>,
}

impl BindingTable {
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub(crate) fn set(&mut self, id: ArrayId, binding: Binding) {
        self.slots[id] = Some(binding);
    }

    /// Binding of array `id`, if it belongs to this table's arena.
    pub fn get(&self, id: ArrayId) -> Option<&Binding> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Number of bound arrays.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over `(array id, binding)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ArrayId, &Binding)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, b)| b.as_ref().map(|b| (id, b)))
    }
}
