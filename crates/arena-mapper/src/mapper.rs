// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Array → host buffer binding.
//!
//! The [`ArenaMapper`] is the gate between build-time offsets and host
//! memory. It never touches buffer contents: it only checks that the host
//! handed over the declared number of buffers, that each is large enough,
//! and that every array of the arena kind fits inside its buffer.

use tracing::debug;

use crate::{ArenaKind, ArenaLayout, ArenaStats, Binding, BindingTable, MappingError};
use tensor_core::ArrayDef;

/// Binds the arrays of one arena kind onto host buffers.
pub struct ArenaMapper;

impl ArenaMapper {
    /// Checks the host buffers of `kind` and resolves every array of that
    /// kind to a [`Binding`].
    ///
    /// `buffer_lens` holds the length in bytes of each host buffer, in
    /// declaration order.
    ///
    /// # Errors
    /// - [`MappingError::BufferCountMismatch`] if the buffer count differs.
    /// - [`MappingError::BufferTooSmall`] if a buffer is below its declared size.
    /// - [`MappingError::UnknownBuffer`] / [`MappingError::ArrayOutOfBounds`]
    ///   if an array does not fit.
    pub fn bind(
        kind: ArenaKind,
        layout: &ArenaLayout,
        arrays: &[ArrayDef],
        buffer_lens: &[usize],
    ) -> Result<BindingTable, MappingError> {
        let decl = layout.decl(kind);
        if buffer_lens.len() != decl.buffers {
            return Err(MappingError::BufferCountMismatch {
                kind,
                expected: decl.buffers,
                actual: buffer_lens.len(),
            });
        }
        if let Some((buffer, &actual)) = buffer_lens
            .iter()
            .enumerate()
            .find(|(_, &len)| len < decl.size_bytes)
        {
            return Err(MappingError::BufferTooSmall {
                kind,
                buffer,
                required: decl.size_bytes,
                actual,
            });
        }

        let mut table = BindingTable::with_len(arrays.len());
        for (id, array) in arrays.iter().enumerate() {
            if ArenaKind::for_class(array.class) != kind {
                continue;
            }
            let len = *buffer_lens
                .get(array.buffer)
                .ok_or_else(|| MappingError::UnknownBuffer {
                    array: array.name.clone(),
                    kind,
                    buffer: array.buffer,
                    buffers: buffer_lens.len(),
                })?;
            if array.end() > len {
                return Err(MappingError::ArrayOutOfBounds {
                    array: array.name.clone(),
                    kind,
                    buffer: array.buffer,
                    end: array.end(),
                    len,
                });
            }
            table.set(
                id,
                Binding {
                    kind,
                    buffer: array.buffer,
                    offset: array.offset,
                    len_bytes: array.size_bytes(),
                    constant: kind == ArenaKind::Weights,
                },
            );
        }

        let stats = ArenaStats::from_table(kind, decl.buffers, decl.total_bytes(), &table);
        debug!("{}", stats.summary());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArenaDecl;
    use tensor_core::DType;

    fn layout() -> ArenaLayout {
        ArenaLayout {
            weights: ArenaDecl::single(208),
            activations: ArenaDecl::single(3_128),
        }
    }

    fn arrays() -> Vec<ArrayDef> {
        vec![
            ArrayDef::transient("input", DType::I8, 784, 2_344).with_io(),
            ArrayDef::persistent("conv2d_0_weights", DType::I8, 144, 0),
            ArrayDef::persistent("conv2d_0_bias", DType::I32, 16, 144),
            ArrayDef::transient("conv2d_0_output", DType::I8, 2_704, 160),
        ]
    }

    #[test]
    fn test_bind_weights_constant() {
        let t = ArenaMapper::bind(ArenaKind::Weights, &layout(), &arrays(), &[208]).unwrap();
        assert_eq!(t.len(), 2);
        assert!(t.get(0).is_none());
        let bias = t.get(2).unwrap();
        assert!(bias.constant);
        assert_eq!(bias.range(), 144..208);
    }

    #[test]
    fn test_bind_activations() {
        let t = ArenaMapper::bind(ArenaKind::Activations, &layout(), &arrays(), &[3_128]).unwrap();
        let ids: Vec<_> = t.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 3]);
        assert!(!t.get(3).unwrap().constant);
    }

    #[test]
    fn test_buffer_count_mismatch() {
        let err = ArenaMapper::bind(ArenaKind::Weights, &layout(), &arrays(), &[]).unwrap_err();
        assert!(matches!(
            err,
            MappingError::BufferCountMismatch { expected: 1, actual: 0, .. }
        ));
    }

    #[test]
    fn test_buffer_too_small() {
        let err =
            ArenaMapper::bind(ArenaKind::Activations, &layout(), &arrays(), &[3_127]).unwrap_err();
        assert!(matches!(err, MappingError::BufferTooSmall { required: 3_128, .. }));
    }

    #[test]
    fn test_array_out_of_bounds() {
        let mut a = arrays();
        a[3].offset = 500;
        let err = ArenaMapper::bind(ArenaKind::Activations, &layout(), &a, &[3_128]).unwrap_err();
        assert!(matches!(err, MappingError::ArrayOutOfBounds { end: 3_204, .. }));
    }

    #[test]
    fn test_unknown_buffer() {
        let mut a = arrays();
        a[1].buffer = 1;
        let err = ArenaMapper::bind(ArenaKind::Weights, &layout(), &a, &[208]).unwrap_err();
        assert!(matches!(err, MappingError::UnknownBuffer { buffer: 1, .. }));
    }
}
