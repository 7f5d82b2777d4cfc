// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mcu-rt run` command: classify one image.
//!
//! ```text
//! load graph → load weights → create_and_init → recentre → run → argmax
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use runtime::{classify, NetworkContext, RuntimeConfig, WeightLoader};

pub fn execute(
    mut config: RuntimeConfig,
    image: PathBuf,
    weights: Option<PathBuf>,
    model: Option<PathBuf>,
    signed: bool,
) -> anyhow::Result<()> {
    super::banner("Inference Runner");
    super::override_paths(&mut config, model, weights);

    let graph = config.load_graph().context("failed to load model")?;
    let blob = WeightLoader::from_config(&config, &graph).context("failed to load weights")?;
    let input = graph.tensors[graph.inputs[0]].clone();

    let mut pixels = read_image(&image)?;
    if signed {
        // Undo the centring so classify() can apply it.
        pixels.iter_mut().for_each(|p| *p ^= 0x80);
    }

    println!("  Model:    {}", graph.summary());
    println!(
        "  Weights:  {} ({} B)",
        config
            .weights_path
            .as_deref()
            .map_or_else(|| "<synthetic>".to_string(), |p| p.display().to_string()),
        blob.len()
    );
    println!("  Image:    {} ({} px)", image.display(), pixels.len());
    println!("  Input:    '{}' {}", input.name, input.shape);
    println!();

    let mut arena = vec![0u8; graph.arenas.activations.size_bytes];
    let params = config.network_params();
    let mut ctx =
        NetworkContext::create_and_init(graph, params, vec![&blob[..]], vec![&mut arena[..]])
            .context("failed to set up the network")?;

    let result = classify(&mut ctx, &pixels).with_context(|| {
        format!("inference failed [{}]", ctx.get_error())
    })?;

    println!("  {:<6} {:>6} {:>8}", "Class", "Score", "P");
    println!("  {}", "-".repeat(22));
    for (i, &s) in result.scores.iter().enumerate() {
        let p = result.probabilities.get(i).copied().unwrap_or(f32::NAN);
        let marker = if i == result.class { " ◄" } else { "" };
        println!("  {i:<6} {s:>6} {p:>8.3}{marker}");
    }
    println!();
    println!("  Prediction: {result}");

    if let Some(m) = ctx.last_metrics() {
        println!();
        println!("  {}", m.summary());
    }
    Ok(())
}

/// Reads a binary PGM (`P5`) or a raw byte image.
pub fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read image '{}'", path.display()))?;
    if bytes.starts_with(b"P5") {
        parse_pgm(&bytes).with_context(|| format!("invalid PGM '{}'", path.display()))
    } else {
        Ok(bytes)
    }
}

/// Parses an 8-bit binary PGM and returns its pixels.
fn parse_pgm(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut pos = 2;
    let mut fields = [0usize; 3];
    for field in &mut fields {
        // Whitespace and `#` comments separate header fields.
        loop {
            match bytes.get(pos) {
                Some(b'#') => {
                    while bytes.get(pos).is_some_and(|&b| b != b'\n') {
                        pos += 1;
                    }
                }
                Some(b) if b.is_ascii_whitespace() => pos += 1,
                _ => break,
            }
        }
        let start = pos;
        while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        if start == pos {
            bail!("truncated header");
        }
        *field = std::str::from_utf8(&bytes[start..pos])?.parse()?;
    }
    let [width, height, maxval] = fields;
    if maxval == 0 || maxval > 255 {
        bail!("only 8-bit PGM is supported (maxval {maxval})");
    }
    // Exactly one whitespace byte ends the header.
    let data = bytes.get(pos + 1..).unwrap_or_default();
    let n = width * height;
    if data.len() < n {
        bail!("expected {n} pixels, found {}", data.len());
    }
    Ok(data[..n].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pgm_with_comment() {
        let mut file = b"P5\n# digit\n2 2\n255\n".to_vec();
        file.extend_from_slice(&[0, 64, 128, 255]);
        assert_eq!(parse_pgm(&file).unwrap(), vec![0, 64, 128, 255]);
    }

    #[test]
    fn test_parse_pgm_rejects_short_data() {
        let file = b"P5 28 28 255\n\x00\x01".to_vec();
        assert!(parse_pgm(&file).is_err());
        assert!(parse_pgm(b"P5 28").is_err());
        assert!(parse_pgm(b"P5 1 1 65535\n\x00\x00").is_err());
    }
}
