// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mcu-rt benchmark` command: time repeated inferences of one context and
//! print latency, throughput and the per-layer split of the last run.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use runtime::{NetworkContext, NetworkParams, RuntimeConfig, WeightLoader};

pub fn execute(
    mut config: RuntimeConfig,
    iterations: usize,
    weights: Option<PathBuf>,
    model: Option<PathBuf>,
) -> anyhow::Result<()> {
    super::banner("Benchmark");
    if iterations == 0 {
        bail!("--iterations must be at least 1");
    }
    super::override_paths(&mut config, model, weights);
    if config.weights_path.is_none() && config.synthetic_seed.is_none() {
        config.synthetic_seed = Some(1);
    }

    let graph = config.load_graph().context("failed to load model")?;
    let blob = WeightLoader::from_config(&config, &graph).context("failed to load weights")?;
    let input_len = graph.tensor_bytes(graph.inputs[0]);
    let output_len = graph.tensor_bytes(graph.outputs[0]);
    let macc = graph.estimated_macc();
    println!("  Model:      {}", graph.summary());
    println!("  Iterations: {iterations}");
    println!();

    let mut arena = vec![0u8; graph.arenas.activations.size_bytes];
    let params = NetworkParams {
        enable_profiling: true,
        ..config.network_params()
    };
    let mut ctx =
        NetworkContext::create_and_init(graph, params, vec![&blob[..]], vec![&mut arena[..]])
            .context("failed to set up the network")?;

    let input: Vec<i8> = (0..input_len).map(|i| (i * 31 % 256) as u8 as i8).collect();
    let mut output = vec![0i8; output_len];

    // Warm-up.
    ctx.run(&input, &mut output)?;

    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let t0 = Instant::now();
        ctx.run(&input, &mut output)?;
        samples.push(t0.elapsed());
    }

    let stats = LatencyStats::from_samples(&mut samples);
    println!("  {:<10} {:>12}", "Latency", "");
    println!("  {}", "-".repeat(24));
    println!("  {:<10} {:>10.1} µs", "min", micros(stats.min));
    println!("  {:<10} {:>10.1} µs", "median", micros(stats.median));
    println!("  {:<10} {:>10.1} µs", "mean", micros(stats.mean));
    println!("  {:<10} {:>10.1} µs", "max", micros(stats.max));
    println!();
    println!(
        "  Throughput: {:.1} inferences/s, {:.1} MMACC/s",
        1.0 / stats.mean.as_secs_f64(),
        macc as f64 / stats.mean.as_secs_f64() / 1e6,
    );

    if let Some(m) = ctx.last_metrics() {
        println!();
        println!("  {:<12} {:<10} {:>10} {:>10}", "Layer", "Type", "MACC", "µs");
        println!("  {}", "-".repeat(46));
        for l in &m.layer_metrics {
            println!(
                "  {:<12} {:<10} {:>10} {:>10.1}",
                l.layer_name,
                l.layer_type,
                l.macc,
                micros(l.duration),
            );
        }
        if let Some(slow) = m.slowest_layer() {
            println!("  Slowest: {}", slow.layer_name);
        }
    }
    Ok(())
}

struct LatencyStats {
    min: Duration,
    median: Duration,
    mean: Duration,
    max: Duration,
}

impl LatencyStats {
    /// Sorts `samples` in place. `samples` must not be empty.
    fn from_samples(samples: &mut [Duration]) -> Self {
        samples.sort_unstable();
        let total: Duration = samples.iter().sum();
        Self {
            min: samples[0],
            median: samples[samples.len() / 2],
            mean: total / samples.len() as u32,
            max: samples[samples.len() - 1],
        }
    }
}

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1e6
}
