// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena occupancy statistics.
//!
//! [`ArenaStats`] summarises how much of a declared arena the bound arrays
//! actually touch. The gap between `high_water_bytes` and the declared size
//! is headroom the build left unused.

use crate::{ArenaKind, BindingTable};

/// Occupancy of one arena after binding.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArenaStats {
    pub kind: ArenaKind,
    pub buffers: usize,
    /// Declared bytes across all buffers.
    pub declared_bytes: usize,
    /// Number of arrays bound into the arena.
    pub arrays: usize,
    /// Sum of array sizes. Exceeds the declared size when arrays share bytes.
    pub array_bytes: usize,
    /// Highest byte end of any array, per buffer, summed.
    pub high_water_bytes: usize,
}

impl ArenaStats {
    pub fn from_table(
        kind: ArenaKind,
        buffers: usize,
        declared_bytes: usize,
        table: &BindingTable,
    ) -> Self {
        let mut high_water = vec![0usize; buffers];
        let mut array_bytes = 0;
        for (_, b) in table.iter() {
            array_bytes += b.len_bytes;
            if let Some(hw) = high_water.get_mut(b.buffer) {
                *hw = (*hw).max(b.range().end);
            }
        }
        Self {
            kind,
            buffers,
            declared_bytes,
            arrays: table.len(),
            array_bytes,
            high_water_bytes: high_water.iter().sum(),
        }
    }

    /// Ratio of summed array bytes to the bytes actually used. Above 1.0
    /// means the layout reuses memory.
    pub fn reuse_factor(&self) -> f64 {
        if self.high_water_bytes == 0 {
            return 0.0;
        }
        self.array_bytes as f64 / self.high_water_bytes as f64
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} arena: {} array(s) in {} buffer(s), high water {} / {} B declared, reuse {:.2}x",
            self.kind,
            self.arrays,
            self.buffers,
            self.high_water_bytes,
            self.declared_bytes,
            self.reuse_factor(),
        )
    }
}
