// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the network context.
//!
//! [`RuntimeError`] is what the Rust API returns. Every error also maps to a
//! [`NetworkError`] pair of stable numeric codes, which the context keeps in
//! its error slot for hosts that poll [`get_error`](crate::NetworkContext::get_error).

use std::fmt;

use crate::ContextState;
use arena_mapper::MappingError;
use model_ir::ModelError;

/// Errors that can occur while creating, initialising or running a network.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The network description failed to load or validate.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Placement verification rejected the activation layout.
    #[error("placement error: {0}")]
    Placement(#[from] arena_planner::PlannerError),

    /// Creation parameters do not match the network.
    #[error("invalid network parameters: {0}")]
    InvalidParams(String),

    /// The configured batch count differs from the compiled one.
    #[error("network is compiled for {expected} batch(es), {actual} requested")]
    BatchMismatch { expected: usize, actual: usize },

    /// The weights buffers could not be bound.
    #[error("weights binding failed: {0}")]
    WeightsBinding(#[source] MappingError),

    /// The activations buffers could not be bound.
    #[error("activations binding failed: {0}")]
    ActivationsBinding(#[source] MappingError),

    /// The operation is not allowed in the current lifecycle state.
    #[error("'{op}' is not allowed in state {state}")]
    InvalidState {
        op: &'static str,
        state: ContextState,
    },

    /// `run` or `forward` was called before a successful `init`.
    #[error("'{op}' called before init")]
    NotInitialised { op: &'static str },

    /// The host input buffer has the wrong length.
    #[error("input '{tensor}' needs {expected} bytes, got {actual}")]
    InputSize {
        tensor: String,
        expected: usize,
        actual: usize,
    },

    /// The host output buffer has the wrong length.
    #[error("output '{tensor}' needs {expected} bytes, got {actual}")]
    OutputSize {
        tensor: String,
        expected: usize,
        actual: usize,
    },

    /// A kernel failed while the engine was running.
    #[error("execution failed in layer '{layer}': {source}")]
    Execution {
        layer: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// The engine processed a different number of batches than configured.
    #[error("run processed {actual} batch(es), expected {expected}")]
    BatchCount { expected: usize, actual: usize },

    /// A weights blob could not be read or packed.
    #[error("weight loading failed for '{source_name}': {detail}")]
    WeightLoad { source_name: String, detail: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`RuntimeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad parameters, buffers or files supplied by the host.
    Configuration,
    /// A failure while executing a correctly configured network.
    Runtime,
    /// An API call out of lifecycle order.
    Misuse,
}

impl RuntimeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RuntimeError::InvalidState { .. } | RuntimeError::NotInitialised { .. } => {
                ErrorClass::Misuse
            }
            RuntimeError::Execution { .. } | RuntimeError::BatchCount { .. } => ErrorClass::Runtime,
            _ => ErrorClass::Configuration,
        }
    }

    /// The numeric error pair recorded in the context's error slot.
    pub fn network_error(&self) -> NetworkError {
        use ErrorCode as C;
        use ErrorKind as K;
        let (kind, code) = match self {
            RuntimeError::Model(e) => (K::CreateFailed, model_code(e)),
            RuntimeError::Placement(_) => (K::CreateFailed, C::Array),
            RuntimeError::InvalidParams(_) => (K::CreateFailed, C::NetworkParams),
            RuntimeError::BatchMismatch { .. } => (K::InvalidParam, C::InvalidBatch),
            RuntimeError::WeightsBinding(_) => (K::InitFailed, C::NetworkWeights),
            RuntimeError::ActivationsBinding(_) => (K::InitFailed, C::NetworkActivations),
            RuntimeError::InvalidState { .. } => (K::InvalidState, C::Network),
            RuntimeError::NotInitialised { .. } => (K::InvalidState, C::MissedInit),
            RuntimeError::InputSize { .. } => (K::InvalidInput, C::InvalidSize),
            RuntimeError::OutputSize { .. } => (K::InvalidOutput, C::InvalidSize),
            RuntimeError::Execution { .. } => (K::ExecutionFailed, C::Layer),
            RuntimeError::BatchCount { .. } => (K::ExecutionFailed, C::InvalidBatch),
            RuntimeError::WeightLoad { .. } => (K::InitFailed, C::NetworkWeights),
            RuntimeError::Config(_) => (K::InvalidParam, C::NetworkParams),
        };
        NetworkError { kind, code }
    }
}

fn model_code(e: &ModelError) -> ErrorCode {
    match e {
        ModelError::ManifestParseError(_) => ErrorCode::InvalidFormat,
        ModelError::InvalidArray { .. } => ErrorCode::Array,
        ModelError::InvalidTensor { .. } => ErrorCode::Tensor,
        ModelError::InvalidLayer { .. }
        | ModelError::Unsupported { .. }
        | ModelError::Kernel { .. } => ErrorCode::Layer,
        _ => ErrorCode::Network,
    }
}

// ── Numeric codes ──────────────────────────────────────────────

/// What went wrong, as a stable numeric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ErrorKind {
    None = 0x00,
    InvalidState = 0x11,
    InvalidInput = 0x12,
    InvalidOutput = 0x13,
    InvalidParam = 0x14,
    InvalidSize = 0x16,
    InitFailed = 0x30,
    CreateFailed = 0x33,
    ExecutionFailed = 0x50,
}

/// Which part of the network the error concerns, as a stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ErrorCode {
    None = 0x00,
    Network = 0x10,
    NetworkParams = 0x11,
    NetworkWeights = 0x12,
    NetworkActivations = 0x13,
    Layer = 0x14,
    Tensor = 0x15,
    Array = 0x16,
    InvalidSize = 0x18,
    InvalidFormat = 0x19,
    InvalidBatch = 0x21,
    MissedInit = 0x30,
}

impl ErrorKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl ErrorCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The `(kind, code)` pair kept in a context's error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct NetworkError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
}

impl NetworkError {
    pub const NONE: NetworkError = NetworkError {
        kind: ErrorKind::None,
        code: ErrorCode::None,
    };

    pub fn is_none(&self) -> bool {
        self.kind == ErrorKind::None
    }
}

impl Default for NetworkError {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} ({:#04x}) / {:?} ({:#04x})",
            self.kind,
            self.kind.as_u8(),
            self.code,
            self.code.as_u8()
        )
    }
}
