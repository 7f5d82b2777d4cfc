// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from a JSON manifest.
//!
//! A model directory contains:
//! - `model.json`: the network manifest (see [`ModelManifest`]).
//! - optionally `model.bin` or `model.safetensors`: the weights blob.
//!
//! Weight *data* is never read here; the runtime loads it separately and
//! binds it as the weights arena.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{builtin, graph, ModelError, ModelGraph, ModelManifest};

/// Default manifest filename.
const MANIFEST_FILE: &str = "model.json";

/// Weight files looked for next to the manifest, in order.
const WEIGHT_FILES: [&str; 2] = ["model.bin", "model.safetensors"];

/// Loads a network description into a validated [`ModelGraph`].
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./models/digits")).unwrap();
/// println!("{}", graph.summary());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a network from a directory holding `model.json`
    /// or from a manifest file path.
    pub fn load(path: &Path) -> Result<ModelGraph<graph::Validated>, ModelError> {
        let manifest_path = Self::manifest_path(path);
        let manifest = ModelManifest::from_file(&manifest_path)?;
        info!(
            "loaded manifest '{}' ({} layers) from {}",
            manifest.info.name,
            manifest.layers.len(),
            manifest_path.display()
        );
        manifest.into_graph()?.validate()
    }

    /// Validates the compiled digit classifier.
    pub fn builtin() -> Result<ModelGraph<graph::Validated>, ModelError> {
        info!("using built-in network");
        builtin::digit_classifier().validate()
    }

    /// Loads `path` when given, the built-in network otherwise.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<ModelGraph<graph::Validated>, ModelError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    /// Weights blob shipped next to a manifest, if any.
    pub fn locate_weights(path: &Path) -> Option<PathBuf> {
        let dir = if path.is_dir() { path } else { path.parent()? };
        WEIGHT_FILES.iter().map(|f| dir.join(f)).find(|p| p.is_file())
    }

    fn manifest_path(path: &Path) -> PathBuf {
        if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("model-ir-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_directory_and_file() {
        let dir = scratch_dir("load");
        let json = ModelManifest::from_graph(&builtin::digit_classifier())
            .to_json()
            .unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), json).unwrap();

        let from_dir = ModelLoader::load(&dir).unwrap();
        let from_file = ModelLoader::load(&dir.join(MANIFEST_FILE)).unwrap();
        assert_eq!(from_dir.num_nodes(), 5);
        assert_eq!(from_file.info.name, "network");
        assert!(ModelLoader::locate_weights(&dir).is_none());

        std::fs::write(dir.join("model.bin"), [0u8; 4]).unwrap();
        assert_eq!(ModelLoader::locate_weights(&dir), Some(dir.join("model.bin")));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_manifest() {
        let dir = scratch_dir("missing");
        assert!(matches!(
            ModelLoader::load(&dir),
            Err(ModelError::ManifestReadError(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_builtin() {
        let g = ModelLoader::load_or_builtin(None).unwrap();
        assert_eq!(g.info.numeric_signature_hex(), "0xf53389be");
    }
}
