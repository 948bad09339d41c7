//! The value carried along a flowsheet edge.
//!
//! A [`Stream`] is a fixed-shape numeric vector. The scheduler never looks at
//! what the entries mean; it only needs zero defaults, elementwise
//! differences for convergence checks, and damped blending for relaxation.

use std::ops::{Deref, Index};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// State width of an ASM1 stream (concentrations, flow, temperature, dummies).
pub const ASM1_WIDTH: usize = 21;

/// Numeric vector carried by an edge. Streams up to [`ASM1_WIDTH`] entries
/// live inline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stream(SmallVec<[f64; ASM1_WIDTH]>);

impl Stream {
    /// A stream of `width` zeros.
    pub fn zeros(width: usize) -> Self {
        Stream(SmallVec::from_elem(0.0, width))
    }

    /// Copies a slice into a new stream.
    pub fn from_slice(values: &[f64]) -> Self {
        Stream(SmallVec::from_slice(values))
    }

    /// Number of entries.
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// The entries as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Maximum absolute elementwise difference to `other`.
    ///
    /// Returns `None` when the two streams have different widths. A NaN on
    /// either side counts as an infinite difference.
    pub fn max_abs_diff(&self, other: &Stream) -> Option<f64> {
        if self.width() != other.width() {
            return None;
        }
        Some(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| {
                    let d = (a - b).abs();
                    if d.is_nan() {
                        f64::INFINITY
                    } else {
                        d
                    }
                })
                .fold(0.0, f64::max),
        )
    }

    /// Under-relaxed blend `(1 - factor) * old + factor * fresh`.
    ///
    /// Returns `None` when the widths differ.
    pub fn relax(old: &Stream, fresh: &Stream, factor: f64) -> Option<Stream> {
        if old.width() != fresh.width() {
            return None;
        }
        Some(
            old.0
                .iter()
                .zip(fresh.0.iter())
                .map(|(o, f)| (1.0 - factor) * o + factor * f)
                .collect(),
        )
    }

    /// Multiplies every entry by `factor`.
    pub fn scaled(&self, factor: f64) -> Stream {
        self.0.iter().map(|v| v * factor).collect()
    }

    /// Elementwise sum. Returns `None` when the widths differ.
    pub fn checked_add(&self, other: &Stream) -> Option<Stream> {
        if self.width() != other.width() {
            return None;
        }
        Some(self.0.iter().zip(other.0.iter()).map(|(a, b)| a + b).collect())
    }
}

impl Deref for Stream {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl Index<usize> for Stream {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl From<Vec<f64>> for Stream {
    fn from(values: Vec<f64>) -> Self {
        Stream(SmallVec::from_vec(values))
    }
}

impl FromIterator<f64> for Stream {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Stream(iter.into_iter().collect())
    }
}
