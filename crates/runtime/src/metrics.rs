// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-layer timing and multiply-accumulate
//! counts for one run. They are only gathered when profiling is enabled,
//! since recording allocates.

use std::time::Duration;

/// Metrics for a single layer's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LayerMetrics {
    /// Layer name.
    pub layer_name: String,
    /// Layer type (`conv_pool`, `dense`, `softmax`).
    pub layer_type: &'static str,
    /// Multiply-accumulates performed.
    pub macc: u64,
    /// Time spent in the layer's kernel phases.
    pub duration: Duration,
}

/// Aggregate metrics for a complete inference run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InferenceMetrics {
    /// Total wall-clock time for the run, including I/O copies.
    pub total_duration: Duration,
    /// Time spent inside layers.
    pub compute_duration: Duration,
    /// Multiply-accumulates over all layers.
    pub total_macc: u64,
    /// Per-layer metrics, in execution order.
    pub layer_metrics: Vec<LayerMetrics>,
    /// Batches processed.
    pub batches: usize,
}

impl InferenceMetrics {
    /// Creates an empty metrics container with room for `num_layers`.
    pub fn new(num_layers: usize) -> Self {
        Self {
            layer_metrics: Vec::with_capacity(num_layers),
            ..Default::default()
        }
    }

    /// Records metrics for a single layer.
    pub fn record_layer(&mut self, name: &str, layer_type: &'static str, macc: u64, duration: Duration) {
        self.compute_duration += duration;
        self.total_macc += macc;
        self.layer_metrics.push(LayerMetrics {
            layer_name: name.to_string(),
            layer_type,
            macc,
            duration,
        });
    }

    /// Finalises metrics with the total wall-clock time and batch count.
    pub fn finalise(&mut self, total: Duration, batches: usize) {
        self.total_duration = total;
        self.batches = batches;
    }

    /// Millions of multiply-accumulates per second over the compute time.
    pub fn mmacc_per_second(&self) -> f64 {
        let secs = self.compute_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_macc as f64 / secs / 1e6
    }

    /// The layer that took longest, if any ran.
    pub fn slowest_layer(&self) -> Option<&LayerMetrics> {
        self.layer_metrics.iter().max_by_key(|l| l.duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Inference: {:.3}ms total, {} layers, {:.3}ms compute, {} MACC ({:.1} MMACC/s), {} batch(es)",
            self.total_duration.as_secs_f64() * 1000.0,
            self.layer_metrics.len(),
            self.compute_duration.as_secs_f64() * 1000.0,
            self.total_macc,
            self.mmacc_per_second(),
            self.batches,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = InferenceMetrics::new(5);
        assert_eq!(m.mmacc_per_second(), 0.0);
        assert!(m.slowest_layer().is_none());
    }

    #[test]
    fn test_record_and_finalise() {
        let mut m = InferenceMetrics::new(2);
        m.record_layer("conv2d_0", "conv_pool", 97_344, Duration::from_millis(3));
        m.record_layer("gemm_5", "dense", 102_400, Duration::from_millis(1));
        m.finalise(Duration::from_millis(5), 1);

        assert_eq!(m.total_macc, 199_744);
        assert_eq!(m.compute_duration, Duration::from_millis(4));
        assert_eq!(m.slowest_layer().unwrap().layer_name, "conv2d_0");
        assert!((m.mmacc_per_second() - 49.936).abs() < 1e-6);
    }

    #[test]
    fn test_summary_format() {
        let mut m = InferenceMetrics::new(1);
        m.record_layer("nl_7", "softmax", 10, Duration::from_micros(10));
        m.finalise(Duration::from_micros(20), 1);

        let s = m.summary();
        assert!(s.starts_with("Inference:"));
        assert!(s.contains("1 layers"));
        assert!(s.contains("1 batch(es)"));
    }
}
