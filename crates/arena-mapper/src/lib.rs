// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # arena-mapper
//!
//! Binds the arrays of a compiled network onto memory the host owns.
//!
//! A compiled network declares two arena classes: read-only weights and
//! read/write activations. The host allocates both (statically, on a
//! microcontroller) and hands them over; this crate checks that they match
//! the declaration and resolves every array's build-time offset to a
//! [`Binding`].
//!
//! # Key Components
//!
//! - [`ArenaLayout`] / [`ArenaDecl`]: declared buffer count and size per kind.
//! - [`ArenaMapper`]: validates host buffers and produces a [`BindingTable`].
//! - [`ArenaStats`]: occupancy and reuse of a bound arena.
//! - [`ByteSize`]: human-readable byte counts (`"16K"`, `"1M"`).
//!
//! # Binding Flow
//!
//! ```text
//! ArrayDef { class, buffer, offset }     host buffers
//!                 │                           │
//!                 └──────► ArenaMapper::bind ◄┘
//!                                 │
//!                                 ▼
//!                BindingTable[ArrayId] = Binding { kind, buffer, range, constant }
//! ```

mod binding;
mod error;
mod layout;
mod mapper;
mod size;
mod stats;

pub use binding::{Binding, BindingTable};
pub use error::MappingError;
pub use layout::{ArenaDecl, ArenaKind, ArenaLayout};
pub use mapper::ArenaMapper;
pub use size::ByteSize;
pub use stats::ArenaStats;
