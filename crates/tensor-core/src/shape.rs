// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Four-dimensional shape and stride descriptors.
//!
//! Every tensor in a compiled network is described in the same
//! `[batch, channels, height, width]` frame. Data is laid out
//! channel-last: the channel index varies fastest in memory.

use std::fmt;

/// A named tensor dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Batch,
    Channel,
    Height,
    Width,
}

impl Axis {
    /// Position of this axis in `[batch, channels, height, width]`.
    pub fn index(self) -> usize {
        match self {
            Axis::Batch => 0,
            Axis::Channel => 1,
            Axis::Height => 2,
            Axis::Width => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Batch => "batch",
            Axis::Channel => "channel",
            Axis::Height => "height",
            Axis::Width => "width",
        }
    }
}

/// Describes the extent of a tensor along its four dimensions.
///
/// Shapes are immutable once created. Convolution weights reuse the frame
/// as `[out_channels, in_channels, kernel_h, kernel_w]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    /// Creates a new shape.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(1, 16, 13, 13);
    /// assert_eq!(s.num_elements(), 2704);
    /// ```
    pub fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Creates a `[1, len, 1, 1]` shape (a flat feature vector).
    pub fn vector(len: usize) -> Self {
        Self::new(1, len, 1, 1)
    }

    /// Returns the dimensions as `[batch, channels, height, width]`.
    pub fn dims(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }

    /// Returns the extent along `axis`.
    pub fn dim(&self, axis: Axis) -> usize {
        self.dims()[axis.index()]
    }

    /// Returns the total number of elements.
    pub fn num_elements(&self) -> usize {
        self.dims().iter().product()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Computes dense channel-last strides for this shape.
    pub fn strides(&self) -> Strides {
        Strides::channel_last(self)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.batch, self.channels, self.height, self.width
        )
    }
}

/// Per-dimension element strides.
///
/// Strides are fixed when a tensor descriptor is built and are never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Strides {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Strides {
    /// Dense channel-last (NHWC) strides for `shape`.
    pub fn channel_last(shape: &Shape) -> Self {
        let channels = 1;
        let width = shape.channels;
        let height = width * shape.width;
        let batch = height * shape.height;
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Returns the strides as `[batch, channels, height, width]`.
    pub fn as_array(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }

    /// Flat element offset of `[b, c, h, w]`.
    pub fn offset(&self, b: usize, c: usize, h: usize, w: usize) -> usize {
        b * self.batch + c * self.channels + h * self.height + w * self.width
    }

    /// Number of elements a tensor of `shape` spans with these strides:
    /// one past the largest addressed element.
    ///
    /// Returns `0` for a shape with any zero extent.
    pub fn span(&self, shape: &Shape) -> usize {
        if shape.num_elements() == 0 {
            return 0;
        }
        shape
            .dims()
            .iter()
            .zip(self.as_array())
            .map(|(&d, s)| (d - 1) * s)
            .sum::<usize>()
            + 1
    }

    /// Returns `true` when these strides are the dense channel-last strides
    /// of `shape`, ignoring the stride of any unit dimension.
    pub fn is_contiguous(&self, shape: &Shape) -> bool {
        let dense = Self::channel_last(shape);
        shape
            .dims()
            .iter()
            .zip(self.as_array().iter().zip(dense.as_array()))
            .all(|(&d, (&s, want))| d <= 1 || s == want)
    }
}

impl fmt::Display for Strides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.batch, self.channels, self.height, self.width
        )
    }
}
