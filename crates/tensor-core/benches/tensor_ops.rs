// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the int8 kernels at digit-classifier sizes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensor_core::{
    conv2d_pool, dense, softmax, ConvGeometry, ConvPoolKernel, DenseKernel, Requantizer,
    SoftmaxKernel,
};

fn pseudo_random_i8(len: usize, mut state: u32) -> Vec<i8> {
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as i8
        })
        .collect()
}

fn bench_conv_pool(c: &mut Criterion) {
    let geometry = ConvGeometry {
        batch: 1,
        in_h: 13,
        in_w: 13,
        in_c: 16,
        out_c: 32,
        kernel_h: 3,
        kernel_w: 3,
        stride_h: 1,
        stride_w: 1,
        dilation_h: 1,
        dilation_w: 1,
        pool_h: 2,
        pool_w: 2,
        pool_stride_h: 2,
        pool_stride_w: 2,
    };
    let kernel = ConvPoolKernel {
        geometry,
        input_zero_point: -128,
        output_zero_point: -128,
        requant: vec![Requantizer::from_scale(0.0025); 32],
    };
    let input = pseudo_random_i8(geometry.input_len(), 7);
    let weights = pseudo_random_i8(geometry.weight_len(), 11);
    let bias = vec![0u8; 32 * 4];
    let mut output = vec![0i8; geometry.output_len()];
    let mut s0 = vec![0u8; geometry.scratch0_bytes()];
    let mut s1 = vec![0u8; geometry.scratch1_bytes()];

    c.bench_function("conv_pool_13x13x16_to_32", |b| {
        b.iter(|| {
            conv2d_pool(
                &kernel,
                black_box(&input),
                &weights,
                &bias,
                &mut output,
                &mut s0,
                &mut s1,
            )
        })
    });
}

fn bench_dense(c: &mut Criterion) {
    let kernel = DenseKernel {
        in_features: 800,
        out_features: 128,
        input_zero_point: -128,
        output_zero_point: -128,
        requant: vec![Requantizer::from_scale(0.003); 128],
    };
    let input = pseudo_random_i8(800, 3);
    let weights = pseudo_random_i8(800 * 128, 5);
    let bias = vec![0u8; 128 * 4];
    let mut output = vec![0i8; 128];
    let mut scratch = vec![0u8; kernel.scratch_bytes()];

    c.bench_function("dense_800_to_128", |b| {
        b.iter(|| dense(&kernel, black_box(&input), &weights, &bias, &mut output, &mut scratch))
    });
}

fn bench_softmax(c: &mut Criterion) {
    let kernel = SoftmaxKernel::from_params(10, [1_811_637_632, 24, -124])
        .expect("valid softmax parameters");
    let input = pseudo_random_i8(10, 9);
    let mut output = vec![0i8; 10];
    let mut scratch = vec![0u8; kernel.scratch_bytes()];

    c.bench_function("softmax_10", |b| {
        b.iter(|| softmax(&kernel, black_box(&input), &mut output, &mut scratch))
    });
}

criterion_group!(benches, bench_conv_pool, bench_dense, bench_softmax);
criterion_main!(benches);
