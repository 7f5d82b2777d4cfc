// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Human-readable byte counts.
//!
//! Microcontroller RAM and flash budgets are usually quoted in kilobytes,
//! so [`ByteSize`] parses `"9712"`, `"16K"`, `"512KB"` or `"1M"`.

use crate::MappingError;
use std::fmt;

/// A byte count with human-readable parsing and display.
///
/// # Examples
/// ```
/// use arena_mapper::ByteSize;
///
/// assert_eq!(ByteSize::parse("16K").unwrap().as_bytes(), 16 * 1024);
/// assert_eq!(ByteSize::parse("9712").unwrap().as_bytes(), 9712);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ByteSize {
    bytes: usize,
}

impl ByteSize {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a size string. Case-insensitive; accepts `K`, `KB`, `M`, `MB`,
    /// `G`, `GB`, `B` or no suffix.
    pub fn parse(s: &str) -> Result<Self, MappingError> {
        let s = s.trim();
        let upper = s.to_uppercase();

        let (num, multiplier) = [
            ("GB", 1usize << 30),
            ("G", 1 << 30),
            ("MB", 1 << 20),
            ("M", 1 << 20),
            ("KB", 1 << 10),
            ("K", 1 << 10),
            ("B", 1),
        ]
        .iter()
        .find(|(suffix, _)| upper.ends_with(suffix))
        .map_or((s, 1), |(suffix, m)| (&s[..s.len() - suffix.len()], *m));

        let value: usize = num
            .trim()
            .parse()
            .map_err(|_| MappingError::InvalidSize(s.to_string()))?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| MappingError::InvalidSize(s.to_string()))?;
        Ok(Self { bytes })
    }
}

impl std::str::FromStr for ByteSize {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bytes;
        if b >= 1 << 20 && b % (1 << 20) == 0 {
            write!(f, "{} MB", b >> 20)
        } else if b >= 1 << 10 && b % (1 << 10) == 0 {
            write!(f, "{} KB", b >> 10)
        } else if b >= 1 << 10 {
            write!(f, "{:.2} KB ({b} B)", b as f64 / 1024.0)
        } else {
            write!(f, "{b} B")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(ByteSize::parse("16K").unwrap().as_bytes(), 16384);
        assert_eq!(ByteSize::parse("16kb").unwrap().as_bytes(), 16384);
        assert_eq!(ByteSize::parse("1M").unwrap().as_bytes(), 1 << 20);
        assert_eq!(ByteSize::parse("2G").unwrap().as_bytes(), 2 << 30);
        assert_eq!(ByteSize::parse("100B").unwrap().as_bytes(), 100);
    }

    #[test]
    fn test_parse_plain_and_whitespace() {
        assert_eq!(ByteSize::parse("9712").unwrap().as_bytes(), 9712);
        assert_eq!(ByteSize::parse("  64 K ").unwrap().as_bytes(), 65536);
        assert_eq!("0".parse::<ByteSize>().unwrap().as_bytes(), 0);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ByteSize::parse("").is_err());
        assert!(ByteSize::parse("lots").is_err());
        assert!(ByteSize::parse("-4K").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ByteSize::from_kb(16).to_string(), "16 KB");
        assert_eq!(ByteSize::from_bytes(1 << 20).to_string(), "1 MB");
        assert_eq!(ByteSize::from_bytes(100).to_string(), "100 B");
        assert_eq!(ByteSize::from_bytes(9712).to_string(), "9.48 KB (9712 B)");
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = ByteSize::from_bytes(109_176);
        let json = serde_json::to_string(&b).unwrap();
        let back: ByteSize = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
