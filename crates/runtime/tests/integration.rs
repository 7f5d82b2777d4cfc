// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end inference on the built-in digit classifier.
//!
//! These tests exercise the complete flow from graph loading → placement
//! verification → arena binding → execution, proving that all five library
//! crates compose correctly through the public lifecycle API.

use arena_planner::{plan_with, StrategyKind};
use model_ir::{graph::Validated, Kernel, LayerNode, ModelGraph, ModelLoader};
use proptest::prelude::*;
use runtime::{
    classify, ArenaKind, ContextState, ErrorClass, ErrorCode, ErrorKind, NetworkContext,
    NetworkParams, RuntimeError, WeightLoader,
};
use tensor_core::{bytes_as_i8, decode_i32, softmax, ConvPoolKernel, DenseKernel, Requantizer};

// ── Helpers ────────────────────────────────────────────────────

const GEMM_6_BIAS: usize = 109_136;

fn graph() -> ModelGraph<Validated> {
    ModelLoader::builtin().unwrap()
}

fn weights(seed: Option<u64>) -> Vec<u8> {
    WeightLoader::synthetic(&graph(), seed).unwrap().to_vec()
}

fn activations(graph: &ModelGraph<Validated>) -> Vec<u8> {
    vec![0u8; graph.arenas.activations.size_bytes]
}

/// Creates, initialises and runs `image` once, returning the scores.
fn infer(graph: ModelGraph<Validated>, blob: &[u8], image: &[i8]) -> Vec<i8> {
    let mut arena = activations(&graph);
    let params = NetworkParams::for_graph(&graph);
    let mut ctx =
        NetworkContext::create_and_init(graph, params, vec![blob], vec![&mut arena[..]]).unwrap();
    let mut scores = vec![0i8; 10];
    assert_eq!(ctx.run(image, &mut scores).unwrap(), 1);
    scores
}

fn test_image() -> Vec<i8> {
    // A vertical bar, roughly a "1".
    (0..784)
        .map(|i| if (12..16).contains(&(i % 28)) { 127 } else { -128 })
        .collect()
}

// ── Lifecycle ──────────────────────────────────────────────────

#[test]
fn test_exact_arenas_bind_inside_buffers() {
    let g = graph();
    let blob = weights(None);
    let mut arena = activations(&g);
    let ctx = NetworkContext::create_and_init(
        g,
        NetworkParams::default(),
        vec![&blob[..]],
        vec![&mut arena[..]],
    )
    .unwrap();
    assert_eq!(ctx.state(), ContextState::Ready);

    let w = ctx.arena_stats(ArenaKind::Weights).unwrap();
    assert_eq!(w.arrays, 8);
    assert_eq!(w.high_water_bytes, 109_176);
    let a = ctx.arena_stats(ArenaKind::Activations).unwrap();
    assert_eq!(a.arrays, 13);
    assert!(a.high_water_bytes <= a.declared_bytes);
    assert!(a.reuse_factor() > 1.0);
}

#[test]
fn test_run_output_shape_and_batches() {
    let blob = weights(Some(3));
    let scores = infer(graph(), &blob, &test_image());
    assert_eq!(scores.len(), 10);

    let g = graph();
    let out = &g.tensors[g.outputs[0]];
    assert_eq!(out.shape.num_elements(), 10);
}

#[test]
fn test_repeated_runs_are_bit_identical() {
    let g = graph();
    let blob = weights(Some(11));
    let mut arena = activations(&g);
    let mut ctx = NetworkContext::create_and_init(
        g,
        NetworkParams::default(),
        vec![&blob[..]],
        vec![&mut arena[..]],
    )
    .unwrap();

    let image = test_image();
    let mut first = [0i8; 10];
    ctx.run(&image, &mut first).unwrap();
    for _ in 0..3 {
        let mut again = [0i8; 10];
        ctx.run(&image, &mut again).unwrap();
        assert_eq!(again, first);
    }
    assert!(ctx.get_error().is_none());
}

#[test]
fn test_destroy_returns_graph_for_reuse() {
    let g = graph();
    let blob = weights(Some(5));
    let mut arena = activations(&g);
    let mut ctx = NetworkContext::create_and_init(
        g,
        NetworkParams::default(),
        vec![&blob[..]],
        vec![&mut arena[..]],
    )
    .unwrap();
    let mut before = [0i8; 10];
    ctx.run(&test_image(), &mut before).unwrap();
    let g = ctx.destroy();

    assert_eq!(infer(g, &blob, &test_image()), before);
}

// ── Error taxonomy ─────────────────────────────────────────────

#[test]
fn test_wrong_input_length_is_configuration_error() {
    let g = graph();
    let blob = weights(None);
    let mut arena = activations(&g);
    let mut ctx = NetworkContext::create_and_init(
        g,
        NetworkParams::default(),
        vec![&blob[..]],
        vec![&mut arena[..]],
    )
    .unwrap();

    let e = ctx.run(&[0; 28], &mut [0; 10]).unwrap_err();
    assert!(matches!(e, RuntimeError::InputSize { expected: 784, actual: 28, .. }));
    assert_eq!(e.class(), ErrorClass::Configuration);
    assert_eq!(ctx.get_error().kind, ErrorKind::InvalidInput);
    assert_eq!(ctx.get_error().code, ErrorCode::InvalidSize);
}

#[test]
fn test_wrong_buffer_count_is_configuration_error() {
    let g = graph();
    let blob = weights(None);
    let mut a = vec![0u8; 9_712];
    let mut b = vec![0u8; 9_712];
    let mut ctx = NetworkContext::create(g, NetworkParams::default()).unwrap();
    let e = ctx
        .init(vec![&blob[..]], vec![&mut a[..], &mut b[..]])
        .unwrap_err();
    assert_eq!(e.class(), ErrorClass::Configuration);
    assert_eq!(ctx.get_error().kind, ErrorKind::InitFailed);
    assert_eq!(ctx.get_error().code, ErrorCode::NetworkActivations);
    assert_eq!(ctx.get_error().to_string(), "InitFailed (0x30) / NetworkActivations (0x13)");
}

#[test]
fn test_run_before_init_is_misuse() {
    let mut ctx = NetworkContext::create(graph(), NetworkParams::default()).unwrap();
    let e = ctx.run(&[0; 784], &mut [0; 10]).unwrap_err();
    assert_eq!(e.class(), ErrorClass::Misuse);
    assert_eq!(ctx.get_error().code, ErrorCode::MissedInit);
    assert!(matches!(ctx.output(), Err(RuntimeError::NotInitialised { .. })));
}

#[test]
fn test_failed_init_then_successful_init_clears_error() {
    let g = graph();
    let blob = weights(None);
    let mut small = vec![0u8; 100];
    let mut arena = activations(&g);
    let mut ctx = NetworkContext::create(g, NetworkParams::default()).unwrap();

    assert!(ctx.init(vec![&blob[..]], vec![&mut small[..]]).is_err());
    assert!(!ctx.get_error().is_none());
    ctx.init(vec![&blob[..]], vec![&mut arena[..]]).unwrap();
    assert!(ctx.get_error().is_none());
}

// ── Classification ─────────────────────────────────────────────

#[test]
fn test_zero_image_zero_weights_picks_first_class() {
    let g = graph();
    let blob = weights(None);
    let mut arena = activations(&g);
    let mut ctx = NetworkContext::create_and_init(
        g,
        NetworkParams::default(),
        vec![&blob[..]],
        vec![&mut arena[..]],
    )
    .unwrap();

    let result = classify(&mut ctx, &[128u8; 784]).unwrap();
    assert_eq!(result.scores, vec![-102i8; 10]);
    assert_eq!(result.class, 0);
    assert_eq!(result.probabilities.len(), 10);
    assert!((result.probabilities[0] - 0.1).abs() < 0.01);
}

#[test]
fn test_biased_class_wins() {
    let mut blob = weights(None);
    blob[GEMM_6_BIAS + 12..GEMM_6_BIAS + 16].copy_from_slice(&10_000i32.to_le_bytes());
    let g = graph();
    let mut arena = activations(&g);
    let mut ctx = NetworkContext::create_and_init(
        g,
        NetworkParams::default(),
        vec![&blob[..]],
        vec![&mut arena[..]],
    )
    .unwrap();

    let result = classify(&mut ctx, &[0u8; 784]).unwrap();
    assert_eq!(result.class, 3);
    assert!(result.confidence().unwrap() > 0.5);
}

// ── Re-placed activations ──────────────────────────────────────

#[test]
fn test_replaced_layouts_match_compiled_outputs() {
    let blob = weights(Some(42));
    let image = test_image();
    let compiled = infer(graph(), &blob, &image);

    for kind in [StrategyKind::Sequential, StrategyKind::Greedy] {
        let g = graph();
        let plan = plan_with(&g, kind).unwrap();
        let replaced = plan.apply(g).unwrap();
        assert_eq!(infer(replaced, &blob, &image), compiled, "strategy {kind}");
    }
}

// ── Direct reference forward pass ──────────────────────────────

fn param<'b>(graph: &ModelGraph<Validated>, node: &LayerNode, blob: &'b [u8], slot: usize) -> &'b [u8] {
    let t = node.params[slot];
    let start = graph.array_of(t).offset;
    &blob[start..start + graph.tensor_bytes(t)]
}

fn requantize(r: &Requantizer, acc: i32, zp: i32) -> i8 {
    r.apply(acc).saturating_add(zp).clamp(-128, 127) as i8
}

/// Conv over every output pixel, then max-pool over the full conv map.
fn reference_conv_pool(k: &ConvPoolKernel, x: &[i8], w: &[i8], bias: &[i32]) -> Vec<i8> {
    let g = &k.geometry;
    let (ch, cw) = (g.conv_h(), g.conv_w());
    let mut conv = vec![0i8; g.batch * ch * cw * g.out_c];
    for b in 0..g.batch {
        for cy in 0..ch {
            for cx in 0..cw {
                for oc in 0..g.out_c {
                    let mut acc = bias[oc];
                    for ky in 0..g.kernel_h {
                        for kx in 0..g.kernel_w {
                            let iy = cy * g.stride_h + ky * g.dilation_h;
                            let ix = cx * g.stride_w + kx * g.dilation_w;
                            for ic in 0..g.in_c {
                                let xv = x[((b * g.in_h + iy) * g.in_w + ix) * g.in_c + ic];
                                let wv = w[((oc * g.kernel_h + ky) * g.kernel_w + kx) * g.in_c + ic];
                                acc += i32::from(wv) * (i32::from(xv) - k.input_zero_point);
                            }
                        }
                    }
                    conv[((b * ch + cy) * cw + cx) * g.out_c + oc] =
                        requantize(&k.requant[oc], acc, k.output_zero_point);
                }
            }
        }
    }
    let (ph, pw) = (g.pooled_h(), g.pooled_w());
    let mut out = vec![i8::MIN; g.output_len()];
    for b in 0..g.batch {
        for py in 0..ph {
            for px in 0..pw {
                for oc in 0..g.out_c {
                    let o = &mut out[((b * ph + py) * pw + px) * g.out_c + oc];
                    for wy in 0..g.pool_h {
                        for wx in 0..g.pool_w {
                            let (cy, cx) = (py * g.pool_stride_h + wy, px * g.pool_stride_w + wx);
                            *o = (*o).max(conv[((b * ch + cy) * cw + cx) * g.out_c + oc]);
                        }
                    }
                }
            }
        }
    }
    out
}

fn reference_dense(k: &DenseKernel, x: &[i8], w: &[i8], bias: &[i32]) -> Vec<i8> {
    x.chunks_exact(k.in_features)
        .flat_map(|row| {
            (0..k.out_features).map(move |o| {
                let acc = row.iter().enumerate().fold(bias[o], |acc, (i, &xv)| {
                    acc + i32::from(w[o * k.in_features + i]) * (i32::from(xv) - k.input_zero_point)
                });
                requantize(&k.requant[o], acc, k.output_zero_point)
            })
        })
        .collect()
}

/// Walks the chain on plain vectors, without arenas or scratch reuse.
fn reference_forward(graph: &ModelGraph<Validated>, blob: &[u8], image: &[i8]) -> Vec<i8> {
    let mut x = image.to_vec();
    for (i, node) in graph.chain() {
        x = match graph.kernel(i) {
            Kernel::ConvPool(k) => reference_conv_pool(
                k,
                &x,
                bytes_as_i8(param(graph, node, blob, 0)),
                &decode_i32(param(graph, node, blob, 1)),
            ),
            Kernel::Dense(k) => reference_dense(
                k,
                &x,
                bytes_as_i8(param(graph, node, blob, 0)),
                &decode_i32(param(graph, node, blob, 1)),
            ),
            Kernel::Softmax(k) => {
                let mut y = vec![0i8; x.len()];
                let mut s = vec![0u8; k.scratch_bytes()];
                softmax(k, &x, &mut y, &mut s).unwrap();
                y
            }
        };
    }
    x
}

#[test]
fn test_arena_run_matches_direct_forward_pass() {
    let g = graph();
    for seed in [1u64, 5, 42, 777] {
        let blob = weights(Some(seed));
        let image: Vec<i8> = (0..784u64)
            .map(|i| (i.wrapping_mul(seed.wrapping_mul(2_654_435_761)) >> 7) as u8 as i8)
            .collect();
        let expected = reference_forward(&g, &blob, &image);
        assert_eq!(infer(graph(), &blob, &image), expected, "seed {seed}");
    }
    assert_eq!(reference_forward(&g, &weights(None), &[0i8; 784]), vec![-102i8; 10]);
}

// ── Property: any image classifies ─────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_any_image_yields_a_class(pixels in prop::collection::vec(any::<u8>(), 784)) {
        let g = graph();
        let blob = weights(Some(9));
        let mut arena = activations(&g);
        let mut ctx = NetworkContext::create_and_init(
            g,
            NetworkParams::default(),
            vec![&blob[..]],
            vec![&mut arena[..]],
        )
        .unwrap();
        let result = classify(&mut ctx, &pixels).unwrap();
        prop_assert!(result.class < 10);
        prop_assert_eq!(result.scores[result.class], *result.scores.iter().max().unwrap());
    }
}
