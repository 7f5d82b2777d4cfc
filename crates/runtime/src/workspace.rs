// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Borrowing operand regions out of the bound arenas.
//!
//! A kernel phase reads one region and writes another. [`Workspace::pair`]
//! hands out exactly that pair as `(&[u8], &mut [u8])`, splitting the host
//! buffers so the borrow checker sees two disjoint slices. Regions that
//! share bytes are refused.

use std::ops::Range;

use tensor_core::TensorError;

/// A byte range inside one host buffer of an arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub buffer: usize,
    pub range: Range<usize>,
}

impl Region {
    pub fn new(buffer: usize, range: Range<usize>) -> Self {
        Self { buffer, range }
    }

    /// Sub-range of this region, relative to its start.
    pub fn sub(&self, rel: Range<usize>) -> Region {
        let start = self.range.start;
        Region {
            buffer: self.buffer,
            range: start + rel.start..start + rel.end,
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    fn overlaps(&self, other: &Region) -> bool {
        self.buffer == other.buffer
            && self.range.start < other.range.end
            && other.range.start < self.range.end
            && !self.is_empty()
            && !other.is_empty()
    }
}

/// The bound weights (read-only) and activations (read/write) buffers.
pub(crate) struct Workspace<'w, 'a> {
    weights: &'w [&'a [u8]],
    activations: &'w mut [&'a mut [u8]],
}

impl<'w, 'a> Workspace<'w, 'a> {
    pub fn new(weights: &'w [&'a [u8]], activations: &'w mut [&'a mut [u8]]) -> Self {
        Self {
            weights,
            activations,
        }
    }

    /// Read-only bytes of a weights region.
    pub fn weights(&self, r: &Region) -> Result<&'w [u8], TensorError> {
        let weights: &'w [&'a [u8]] = self.weights;
        check_bounds(r, weights.get(r.buffer).map_or(0, |b| b.len()))?;
        Ok(&weights[r.buffer][r.range.clone()])
    }

    /// Read-only bytes of an activations region.
    pub fn read(&self, r: &Region) -> Result<&[u8], TensorError> {
        check_bounds(r, self.activations_len(r.buffer))?;
        Ok(&self.activations[r.buffer][r.range.clone()])
    }

    /// Mutable bytes of an activations region.
    pub fn write(&mut self, r: &Region) -> Result<&mut [u8], TensorError> {
        check_bounds(r, self.activations_len(r.buffer))?;
        Ok(&mut self.activations[r.buffer][r.range.clone()])
    }

    fn activations_len(&self, buffer: usize) -> usize {
        self.activations.get(buffer).map_or(0, |b| b.len())
    }

    /// Borrows `src` for reading and `dst` for writing at the same time.
    ///
    /// # Errors
    /// [`TensorError::Overlap`] if the regions share bytes, and
    /// [`TensorError::OutOfBounds`] if either leaves its buffer.
    pub fn pair(
        &mut self,
        op: &'static str,
        src: &Region,
        dst: &Region,
    ) -> Result<(&[u8], &mut [u8]), TensorError> {
        if src.overlaps(dst) {
            return Err(TensorError::Overlap {
                op,
                src: src.range.clone(),
                dst: dst.range.clone(),
            });
        }
        for r in [src, dst] {
            check_bounds(r, self.activations_len(r.buffer))?;
        }

        if src.buffer == dst.buffer {
            let buf: &mut [u8] = &mut *self.activations[src.buffer];
            if src.range.end <= dst.range.start {
                let (lo, hi) = buf.split_at_mut(dst.range.start);
                Ok((&lo[src.range.clone()], &mut hi[..dst.len()]))
            } else {
                let (lo, hi) = buf.split_at_mut(src.range.start);
                Ok((&hi[..src.len()], &mut lo[dst.range.clone()]))
            }
        } else if src.buffer < dst.buffer {
            let (lo, hi) = self.activations.split_at_mut(dst.buffer);
            Ok((&lo[src.buffer][src.range.clone()], &mut hi[0][dst.range.clone()]))
        } else {
            let (lo, hi) = self.activations.split_at_mut(src.buffer);
            Ok((&hi[0][src.range.clone()], &mut lo[dst.buffer][dst.range.clone()]))
        }
    }
}

fn check_bounds(r: &Region, len: usize) -> Result<(), TensorError> {
    if r.range.start > r.range.end || r.range.end > len {
        return Err(TensorError::OutOfBounds {
            tensor: format!("region {}:{:?}", r.buffer, r.range),
            span: r.range.end,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_same_buffer_both_orders() {
        let mut arena = vec![0u8; 16];
        let weights: Vec<&[u8]> = vec![];
        let mut acts: Vec<&mut [u8]> = vec![arena.as_mut_slice()];
        let mut ws = Workspace::new(&weights, &mut acts);

        let (src, dst) = ws.pair("t", &Region::new(0, 0..4), &Region::new(0, 8..12)).unwrap();
        assert_eq!(src.len(), 4);
        dst.copy_from_slice(&[1, 2, 3, 4]);

        let (src, dst) = ws.pair("t", &Region::new(0, 8..12), &Region::new(0, 2..6)).unwrap();
        dst.copy_from_slice(src);
        assert_eq!(ws.read(&Region::new(0, 0..8)).unwrap(), &[0, 0, 1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn test_pair_across_buffers() {
        let (mut a, mut b) = (vec![7u8; 4], vec![0u8; 4]);
        let weights: Vec<&[u8]> = vec![];
        let mut acts: Vec<&mut [u8]> = vec![a.as_mut_slice(), b.as_mut_slice()];
        let mut ws = Workspace::new(&weights, &mut acts);
        let (src, dst) = ws.pair("t", &Region::new(0, 0..4), &Region::new(1, 0..4)).unwrap();
        dst.copy_from_slice(src);
        let (src, dst) = ws.pair("t", &Region::new(1, 0..2), &Region::new(0, 2..4)).unwrap();
        dst.copy_from_slice(src);
        drop(ws);
        assert_eq!(b, [7; 4]);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut arena = vec![0u8; 16];
        let weights: Vec<&[u8]> = vec![];
        let mut acts: Vec<&mut [u8]> = vec![arena.as_mut_slice()];
        let mut ws = Workspace::new(&weights, &mut acts);
        assert!(matches!(
            ws.pair("t", &Region::new(0, 0..8), &Region::new(0, 4..12)),
            Err(TensorError::Overlap { op: "t", .. })
        ));
        assert!(matches!(
            ws.pair("t", &Region::new(0, 0..4), &Region::new(0, 12..20)),
            Err(TensorError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_weights_read_only() {
        let blob = [1u8, 2, 3, 4];
        let weights: Vec<&[u8]> = vec![&blob[..]];
        let mut acts: Vec<&mut [u8]> = vec![];
        let ws = Workspace::new(&weights, &mut acts);
        assert_eq!(ws.weights(&Region::new(0, 1..3)).unwrap(), &[2, 3]);
        assert!(ws.weights(&Region::new(1, 0..1)).is_err());
    }
}
