// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Index of the largest int8 score.

/// Returns the index of the maximum score, or `None` for an empty slice.
///
/// Ties resolve to the lowest index (strict `>` scan).
pub fn argmax_i8(scores: &[i8]) -> Option<usize> {
    let (&first, rest) = scores.split_first()?;
    let mut best = (0, first);
    for (i, &v) in rest.iter().enumerate() {
        if v > best.1 {
            best = (i + 1, v);
        }
    }
    Some(best.0)
}
