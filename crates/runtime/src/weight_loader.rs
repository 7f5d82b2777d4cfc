// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Weights blobs for the read-only weights arena.
//!
//! [`WeightLoader`] produces one [`WeightsBlob`] laid out exactly like the
//! compiled weights arena, from one of three sources:
//!
//! 1. **Raw `.bin`**: the arena image itself, memory-mapped.
//! 2. **SafeTensors**: one tensor per weights array, named after the array,
//!    packed into a fresh blob at each array's offset.
//! 3. **Synthetic**: zeroed, or deterministic pseudo-random from a seed,
//!    for tests and benchmarks without model files.

use std::ops::Deref;
use std::path::Path;

use arena_mapper::ArenaKind;
use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use tensor_core::DType;

use crate::{RuntimeConfig, RuntimeError};

/// Bytes of a weights arena, mapped from disk or owned.
pub enum WeightsBlob {
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl WeightsBlob {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WeightsBlob::Mapped(m) => m,
            WeightsBlob::Owned(v) => v,
        }
    }

    /// Returns `true` if the bytes come from a memory-mapped file.
    pub fn is_file_backed(&self) -> bool {
        matches!(self, WeightsBlob::Mapped(_))
    }
}

impl Deref for WeightsBlob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for WeightsBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightsBlob")
            .field("len", &self.len())
            .field("file_backed", &self.is_file_backed())
            .finish()
    }
}

/// Builds weights blobs for a validated graph.
pub struct WeightLoader;

impl WeightLoader {
    /// Resolves the blob a configuration asks for.
    ///
    /// Order: `weights_path`, then a weights file next to `model_path`,
    /// then synthetic weights from `synthetic_seed`.
    pub fn from_config(
        config: &RuntimeConfig,
        graph: &ModelGraph<Validated>,
    ) -> Result<WeightsBlob, RuntimeError> {
        let located = config
            .weights_path
            .clone()
            .or_else(|| config.model_path.as_deref().and_then(ModelLoader::locate_weights));
        match located {
            Some(path) => Self::load(&path, graph),
            None => {
                tracing::warn!("no weights file configured, using synthetic weights");
                Self::synthetic(graph, config.synthetic_seed)
            }
        }
    }

    /// Loads `path`, choosing the format by extension.
    pub fn load(path: &Path, graph: &ModelGraph<Validated>) -> Result<WeightsBlob, RuntimeError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("safetensors") => Self::load_safetensors(path, graph),
            _ => Self::load_bin(path, graph),
        }
    }

    /// Memory-maps a raw weights arena image.
    pub fn load_bin(path: &Path, graph: &ModelGraph<Validated>) -> Result<WeightsBlob, RuntimeError> {
        let required = single_buffer(graph, path)?;
        let mmap = map(path)?;
        if mmap.len() < required {
            return Err(load_error(
                path,
                format!("blob holds {} bytes, the weights arena needs {required}", mmap.len()),
            ));
        }
        tracing::info!(
            "weight loader: mmap'd {} ({:.1} KiB)",
            path.display(),
            mmap.len() as f64 / 1024.0
        );
        Ok(WeightsBlob::Mapped(mmap))
    }

    /// Packs a SafeTensors file into an arena image.
    ///
    /// Every weights array must have a tensor of the same name, element
    /// type and byte size.
    pub fn load_safetensors(
        path: &Path,
        graph: &ModelGraph<Validated>,
    ) -> Result<WeightsBlob, RuntimeError> {
        let size = single_buffer(graph, path)?;
        let mmap = map(path)?;
        let st = safetensors::SafeTensors::deserialize(&mmap)
            .map_err(|e| load_error(path, format!("SafeTensors parse error: {e}")))?;

        let mut blob = vec![0u8; size];
        for (_, array) in graph.arrays_in(ArenaKind::Weights) {
            let view = st
                .tensor(&array.name)
                .map_err(|e| load_error(path, format!("tensor '{}' not found: {e}", array.name)))?;
            let expected = st_dtype(array.dtype);
            if view.dtype() != expected {
                return Err(load_error(
                    path,
                    format!("tensor '{}' is {:?}, expected {expected:?}", array.name, view.dtype()),
                ));
            }
            let data = view.data();
            if data.len() != array.size_bytes() {
                return Err(load_error(
                    path,
                    format!(
                        "tensor '{}' holds {} bytes, array needs {}",
                        array.name,
                        data.len(),
                        array.size_bytes()
                    ),
                ));
            }
            blob[array.offset..array.end()].copy_from_slice(data);
        }
        tracing::info!(
            "weight loader: packed {} tensors from {}",
            graph.arrays_in(ArenaKind::Weights).count(),
            path.display()
        );
        Ok(WeightsBlob::Owned(blob))
    }

    /// Creates a weights arena without a file.
    ///
    /// With no seed every byte is zero. With a seed, int8 weights are
    /// uniform over `[-128, 127]` and wider arrays (biases) hold small values
    /// in `[-1024, 1023]`, so the outputs stay away from saturation.
    pub fn synthetic(
        graph: &ModelGraph<Validated>,
        seed: Option<u64>,
    ) -> Result<WeightsBlob, RuntimeError> {
        let size = single_buffer(graph, Path::new("<synthetic>"))?;
        let mut blob = vec![0u8; size];
        if let Some(seed) = seed {
            let mut rng = SplitMix64(seed);
            for (_, array) in graph.arrays_in(ArenaKind::Weights) {
                let bytes = &mut blob[array.offset..array.end()];
                match array.dtype {
                    DType::I8 | DType::U8 => bytes.iter_mut().for_each(|b| *b = rng.next() as u8),
                    DType::I16 => {
                        for chunk in bytes.chunks_exact_mut(2) {
                            chunk.copy_from_slice(&rng.small().to_le_bytes()[..2]);
                        }
                    }
                    DType::I32 => {
                        for chunk in bytes.chunks_exact_mut(4) {
                            chunk.copy_from_slice(&rng.small().to_le_bytes());
                        }
                    }
                    DType::F32 => {}
                }
            }
        }
        tracing::debug!("weight loader: synthetic blob of {size} bytes (seed {seed:?})");
        Ok(WeightsBlob::Owned(blob))
    }
}

// ── Private helpers ────────────────────────────────────────────

/// Declared size of the only weights buffer.
fn single_buffer(graph: &ModelGraph<Validated>, path: &Path) -> Result<usize, RuntimeError> {
    let decl = graph.arenas.weights;
    if decl.buffers != 1 {
        return Err(load_error(
            path,
            format!("weights arena has {} buffers, loaders fill exactly one", decl.buffers),
        ));
    }
    Ok(decl.size_bytes)
}

fn st_dtype(dtype: DType) -> safetensors::Dtype {
    match dtype {
        DType::I8 => safetensors::Dtype::I8,
        DType::U8 => safetensors::Dtype::U8,
        DType::I16 => safetensors::Dtype::I16,
        DType::I32 => safetensors::Dtype::I32,
        DType::F32 => safetensors::Dtype::F32,
    }
}

fn map(path: &Path) -> Result<memmap2::Mmap, RuntimeError> {
    let file = std::fs::File::open(path)
        .map_err(|e| load_error(path, format!("cannot open: {e}")))?;
    // SAFETY: the mapping is read-only and the file is not modified while
    // the blob is alive.
    unsafe { memmap2::Mmap::map(&file) }.map_err(|e| load_error(path, format!("mmap failed: {e}")))
}

fn load_error(path: &Path, detail: String) -> RuntimeError {
    RuntimeError::WeightLoad {
        source_name: path.display().to_string(),
        detail,
    }
}

/// Deterministic generator for synthetic weights.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn small(&mut self) -> i32 {
        (self.next() % 2048) as i32 - 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::builtin;
    use std::path::PathBuf;

    fn graph() -> ModelGraph<Validated> {
        builtin::digit_classifier().validate().unwrap()
    }

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("runtime-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_synthetic_zero_and_seeded() {
        let g = graph();
        let zero = WeightLoader::synthetic(&g, None).unwrap();
        assert_eq!(zero.len(), builtin::WEIGHTS_BYTES);
        assert!(zero.iter().all(|&b| b == 0));
        assert!(!zero.is_file_backed());

        let a = WeightLoader::synthetic(&g, Some(7)).unwrap();
        let b = WeightLoader::synthetic(&g, Some(7)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        let bias = tensor_core::decode_i32(&a[144..208]);
        assert!(bias.iter().all(|v| (-1024..1024).contains(v)));
    }

    #[test]
    fn test_load_bin() {
        let g = graph();
        let path = scratch_file("weights.bin");
        std::fs::write(&path, vec![3u8; builtin::WEIGHTS_BYTES]).unwrap();
        let blob = WeightLoader::load(&path, &g).unwrap();
        assert!(blob.is_file_backed());
        assert_eq!(blob[0], 3);

        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(matches!(
            WeightLoader::load_bin(&path, &g),
            Err(RuntimeError::WeightLoad { .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_safetensors_packs_at_offsets() {
        use safetensors::tensor::TensorView;

        let g = graph();
        let arrays: Vec<_> = g.arrays_in(ArenaKind::Weights).map(|(_, a)| a.clone()).collect();
        let data: Vec<Vec<u8>> = arrays
            .iter()
            .enumerate()
            .map(|(i, a)| vec![i as u8 + 1; a.size_bytes()])
            .collect();
        let views: Vec<(String, TensorView<'_>)> = arrays
            .iter()
            .zip(&data)
            .map(|(a, d)| {
                let view = TensorView::new(st_dtype(a.dtype), vec![a.len], d).unwrap();
                (a.name.clone(), view)
            })
            .collect();
        let bytes = safetensors::serialize(views, &None).unwrap();
        let path = scratch_file("model.safetensors");
        std::fs::write(&path, bytes).unwrap();

        let blob = WeightLoader::load(&path, &g).unwrap();
        assert_eq!(blob.len(), builtin::WEIGHTS_BYTES);
        for (i, a) in arrays.iter().enumerate() {
            assert!(blob[a.offset..a.end()].iter().all(|&b| b == i as u8 + 1));
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_from_config_falls_back_to_synthetic() {
        let g = graph();
        let config = RuntimeConfig {
            synthetic_seed: Some(1),
            ..Default::default()
        };
        let blob = WeightLoader::from_config(&config, &g).unwrap();
        assert!(!blob.is_file_backed());
        assert!(blob.iter().any(|&b| b != 0));
    }
}
