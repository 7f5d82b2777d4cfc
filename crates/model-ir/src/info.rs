// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Identity and build metadata of a compiled network.

/// Metadata stamped into a network at build time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    /// Network name (e.g. `"network"`).
    pub name: String,
    /// Hex signature of the source model.
    pub signature: String,
    /// Build timestamp of the source model.
    pub datetime: String,
    /// 32-bit signature of the compiled tables.
    #[serde(default)]
    pub numeric_signature: u32,
    /// Multiply-accumulate count declared by the compiler.
    #[serde(default)]
    pub n_macc: u64,
    /// Batch count the network was compiled for.
    #[serde(default = "one")]
    pub batches: usize,
}

fn one() -> usize {
    1
}

impl ModelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: String::new(),
            datetime: String::new(),
            numeric_signature: 0,
            n_macc: 0,
            batches: 1,
        }
    }

    /// `0x`-prefixed numeric signature.
    pub fn numeric_signature_hex(&self) -> String {
        format!("{:#010x}", self.numeric_signature)
    }
}
