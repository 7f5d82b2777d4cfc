// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Array lifetimes over the layer chain.
//!
//! Chain steps are numbered from 1 in execution order; step 0 is the host
//! writing the model inputs, and the step after the last node is the host
//! reading the outputs. An array is live from its first write to its last
//! read, both inclusive.
//!
//! # Streaming exception
//!
//! A conv + pool node consumes its input one row window at a time and emits
//! one pooled row per window. Its output may therefore overlap its input
//! as long as no emitted row lands on input bytes a later window still
//! reads. [`streaming_safe`] checks this row by row for concrete offsets.

use std::ops::Range;

use model_ir::{graph::Validated, Kernel, ModelGraph};
use tensor_core::{ArrayClass, ArrayId, ConvGeometry};

/// Inclusive range of chain steps during which an array is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Lifetime {
    pub first: usize,
    pub last: usize,
}

impl Lifetime {
    pub fn intersects(&self, other: &Lifetime) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    fn touch(this: &mut Option<Lifetime>, step: usize) {
        *this = Some(match *this {
            Some(l) => Lifetime {
                first: l.first.min(step),
                last: l.last.max(step),
            },
            None => Lifetime {
                first: step,
                last: step,
            },
        });
    }
}

/// A conv + pool node whose input dies where its output is born.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPair {
    pub input: ArrayId,
    pub output: ArrayId,
    pub geometry: ConvGeometry,
}

/// Lifetimes and sizes of the transient arrays of a graph.
#[derive(Debug, Clone)]
pub struct Liveness {
    lifetimes: Vec<Option<Lifetime>>,
    sizes: Vec<usize>,
    buffers: Vec<usize>,
    streams: Vec<StreamPair>,
    steps: usize,
}

impl Liveness {
    /// Walks the chain and records when each transient array is live.
    ///
    /// Persistent arrays and transient arrays no node touches get no
    /// lifetime.
    pub fn analyze(graph: &ModelGraph<Validated>) -> Self {
        let n = graph.arrays.len();
        let mut lifetimes: Vec<Option<Lifetime>> = vec![None; n];
        let array = |t: usize| graph.tensors[t].array;

        for &t in &graph.inputs {
            Lifetime::touch(&mut lifetimes[array(t)], 0);
        }
        let mut steps = 0;
        for (k, (_, node)) in graph.chain().enumerate() {
            let step = k + 1;
            for &t in node.inputs.iter().chain(&node.outputs).chain(&node.scratch) {
                Lifetime::touch(&mut lifetimes[array(t)], step);
            }
            steps = step;
        }
        for &t in &graph.outputs {
            Lifetime::touch(&mut lifetimes[array(t)], steps + 1);
        }
        for (a, def) in graph.arrays.iter().enumerate() {
            if def.class != ArrayClass::Transient {
                lifetimes[a] = None;
            }
        }

        let mut streams = Vec::new();
        for (k, (i, node)) in graph.chain().enumerate() {
            let step = k + 1;
            if let Kernel::ConvPool(kernel) = graph.kernel(i) {
                let (input, output) = (array(node.inputs[0]), array(node.outputs[0]));
                let dies = lifetimes[input].is_some_and(|l| l.last == step);
                let born = lifetimes[output].is_some_and(|l| l.first == step);
                if dies && born {
                    streams.push(StreamPair {
                        input,
                        output,
                        geometry: kernel.geometry,
                    });
                }
            }
        }

        Self {
            lifetimes,
            sizes: graph.arrays.iter().map(|a| a.size_bytes()).collect(),
            buffers: graph.arrays.iter().map(|a| a.buffer).collect(),
            streams,
            steps,
        }
    }

    /// Lifetime of array `a`, if it is a live transient array.
    pub fn lifetime(&self, a: ArrayId) -> Option<Lifetime> {
        self.lifetimes.get(a).copied().flatten()
    }

    /// Arrays with a lifetime, in id order.
    pub fn live_arrays(&self) -> impl Iterator<Item = ArrayId> + '_ {
        (0..self.lifetimes.len()).filter(|&a| self.lifetimes[a].is_some())
    }

    /// Number of nodes in the chain.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn size_bytes(&self, a: ArrayId) -> usize {
        self.sizes[a]
    }

    pub fn streams(&self) -> &[StreamPair] {
        &self.streams
    }

    /// Whether `a` at `a_off` and `b` at `b_off` can coexist.
    pub fn compatible(&self, a: ArrayId, a_off: usize, b: ArrayId, b_off: usize) -> bool {
        let (Some(la), Some(lb)) = (self.lifetime(a), self.lifetime(b)) else {
            return true;
        };
        if !la.intersects(&lb) || self.buffers[a] != self.buffers[b] {
            return true;
        }
        if !overlaps(&(a_off..a_off + self.sizes[a]), &(b_off..b_off + self.sizes[b])) {
            return true;
        }
        self.streams.iter().any(|s| {
            (s.input == a && s.output == b && streaming_safe(&s.geometry, a_off, b_off))
                || (s.input == b && s.output == a && streaming_safe(&s.geometry, b_off, a_off))
        })
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end && !a.is_empty() && !b.is_empty()
}

/// Whether a conv + pool layer can stream from an input at `in_off` into
/// an output at `out_off` of the same buffer.
///
/// After pooled rows `0..=k` are emitted, the written bytes must not reach
/// any input byte read by rows after `k`.
pub fn streaming_safe(g: &ConvGeometry, in_off: usize, out_off: usize) -> bool {
    let per_batch = g.pooled_h();
    let total = g.batch * per_batch;
    if total == 0 {
        return true;
    }
    let at = |k: usize| (k / per_batch, k % per_batch);
    let (lb, lr) = at(total - 1);
    let needed_end = in_off + g.input_window(lb, lr).end;

    (0..total - 1).all(|k| {
        let (b, r) = at(k);
        let written = out_off..out_off + g.output_row(b, r).end;
        let (nb, nr) = at(k + 1);
        let needed = in_off + g.input_window(nb, nr).start..needed_end;
        !overlaps(&written, &needed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::builtin;

    fn graph() -> ModelGraph<Validated> {
        builtin::digit_classifier().validate().unwrap()
    }

    fn array(g: &ModelGraph<Validated>, name: &str) -> ArrayId {
        g.arrays.iter().position(|a| a.name == name).unwrap()
    }

    #[test]
    fn test_lifetimes() {
        let g = graph();
        let l = Liveness::analyze(&g);
        assert_eq!(l.steps(), 5);
        let input = array(&g, "serving_default_keras_tensor0_output");
        assert_eq!(l.lifetime(input), Some(Lifetime { first: 0, last: 1 }));
        assert_eq!(
            l.lifetime(array(&g, "conv2d_2_output")),
            Some(Lifetime { first: 2, last: 3 })
        );
        assert_eq!(
            l.lifetime(array(&g, "gemm_6_scratch0")),
            Some(Lifetime { first: 4, last: 4 })
        );
        assert_eq!(l.lifetime(array(&g, "nl_7_output")), Some(Lifetime { first: 5, last: 6 }));
        assert_eq!(l.lifetime(array(&g, "gemm_5_weights")), None);
    }

    #[test]
    fn test_both_convs_stream() {
        let g = graph();
        let l = Liveness::analyze(&g);
        assert_eq!(l.streams().len(), 2);
        assert_eq!(l.streams()[1].output, array(&g, "conv2d_2_output"));
    }

    #[test]
    fn test_compiled_offsets_stream_safely() {
        let g = graph();
        let l = Liveness::analyze(&g);
        let (i, o) = (array(&g, "conv2d_0_output"), array(&g, "conv2d_2_output"));
        assert!(l.compatible(i, 160, o, 0));
        assert!(l.compatible(o, 0, i, 160));
    }

    #[test]
    fn test_streaming_unsafe_when_output_runs_ahead() {
        let g = graph();
        let s = Liveness::analyze(&g).streams()[1];
        // Output trails the input.
        assert!(streaming_safe(&s.geometry, 160, 0));
        // Output starts on the window pooled row 1 still needs.
        assert!(!streaming_safe(&s.geometry, 0, 2 * s.geometry.in_row_bytes()));
    }

    #[test]
    fn test_disjoint_lifetimes_share_bytes() {
        let g = graph();
        let l = Liveness::analyze(&g);
        let (a, b) = (array(&g, "conv2d_2_output"), array(&g, "gemm_6_scratch0"));
        assert!(l.compatible(a, 0, b, 0));
        let (c, d) = (array(&g, "gemm_5_output"), array(&g, "gemm_6_output"));
        assert!(!l.compatible(c, 0, d, 0));
    }

    #[test]
    fn test_lifetime_intersects() {
        let a = Lifetime { first: 1, last: 2 };
        assert!(a.intersects(&Lifetime { first: 2, last: 3 }));
        assert!(!a.intersects(&Lifetime { first: 3, last: 3 }));
    }
}
