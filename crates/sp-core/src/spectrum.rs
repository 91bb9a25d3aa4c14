//! Binned spectrum data model.
//!
//! A [`Spectrum`] is an ordered multi-dimensional histogram: one [`Axis`] per
//! physical dimension (energy, radius, ...) over a row-major flat array of
//! non-negative bin contents. Spectra are produced by external simulation or
//! by the smearing engine; engine operations return new spectra rather than
//! mutating their input.

use crate::error::{Error, Result};

/// One binned dimension of a spectrum.
///
/// The range is half-open: a value `v` belongs to the axis iff
/// `low <= v < high`. Bin `i` covers `[low + i*width, low + (i+1)*width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    low: f64,
    high: f64,
    n_bins: usize,
}

impl Axis {
    /// Create a validated axis.
    pub fn new(name: impl Into<String>, low: f64, high: f64, n_bins: usize) -> Result<Self> {
        let name = name.into();
        if !low.is_finite() || !high.is_finite() || high <= low {
            return Err(Error::InvalidConfiguration(format!(
                "axis '{}' range must be finite with high > low, got [{}, {})",
                name, low, high
            )));
        }
        if n_bins == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "axis '{}' must have at least one bin",
                name
            )));
        }
        Ok(Self { name, low, high, n_bins })
    }

    /// Axis name (`"energy"`, `"radius"`, ...).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower range edge (inclusive).
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper range edge (exclusive).
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Width of each bin.
    pub fn bin_width(&self) -> f64 {
        (self.high - self.low) / self.n_bins as f64
    }

    /// Lower edge of bin `i`; `i == n_bins` gives the upper range edge.
    pub fn bin_edge(&self, i: usize) -> f64 {
        self.low + i as f64 * self.bin_width()
    }

    /// Centre of bin `i`.
    pub fn bin_centre(&self, i: usize) -> f64 {
        self.low + (i as f64 + 0.5) * self.bin_width()
    }

    /// Bin index containing `value`, or `None` outside `[low, high)`.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if value < self.low || value >= self.high {
            return None;
        }
        let i = ((value - self.low) / self.bin_width()) as usize;
        // Rounding near the upper edge must not index past the last bin.
        Some(i.min(self.n_bins - 1))
    }
}

/// A multi-dimensional binned spectrum with row-major flat storage (the last
/// axis varies fastest).
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    axes: Vec<Axis>,
    data: Vec<f64>,
}

impl Spectrum {
    /// Create an empty (zero-filled) spectrum over the given axes.
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        let len = checked_len(&axes)?;
        Ok(Self { axes, data: vec![0.0; len] })
    }

    /// Create a spectrum from existing bin contents.
    pub fn with_data(axes: Vec<Axis>, data: Vec<f64>) -> Result<Self> {
        let len = checked_len(&axes)?;
        if data.len() != len {
            return Err(Error::ShapeMismatch(format!(
                "data length {} does not match the {} bins implied by the axes",
                data.len(),
                len
            )));
        }
        if data.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(Error::InvalidConfiguration(
                "bin contents must be finite and non-negative".to_string(),
            ));
        }
        Ok(Self { axes, data })
    }

    /// Axes, in storage order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Look up an axis by name, returning its index and definition.
    pub fn axis(&self, name: &str) -> Option<(usize, &Axis)> {
        self.axes.iter().enumerate().find(|(_, a)| a.name() == name)
    }

    /// Flat bin contents (row-major).
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Total content summed over all bins.
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Stride (in flat elements) between neighbouring bins along axis `k`.
    pub fn stride(&self, k: usize) -> usize {
        self.axes[k + 1..].iter().map(Axis::n_bins).product()
    }

    /// True when `other` has the same axes (names, ranges and binning).
    pub fn same_shape(&self, other: &Spectrum) -> bool {
        self.axes == other.axes
    }

    /// Add `weight` at the given per-axis coordinates.
    ///
    /// Returns `Ok(false)`, dropping the weight, when any coordinate falls
    /// outside its axis range; `Err` when the coordinate count is wrong.
    pub fn fill(&mut self, coords: &[f64], weight: f64) -> Result<bool> {
        if coords.len() != self.axes.len() {
            return Err(Error::ShapeMismatch(format!(
                "expected {} coordinates, got {}",
                self.axes.len(),
                coords.len()
            )));
        }
        let mut flat = 0;
        for (k, (axis, &v)) in self.axes.iter().zip(coords).enumerate() {
            match axis.bin_index(v) {
                Some(i) => flat += i * self.stride(k),
                None => return Ok(false),
            }
        }
        self.data[flat] += weight;
        Ok(true)
    }
}

fn checked_len(axes: &[Axis]) -> Result<usize> {
    if axes.is_empty() {
        return Err(Error::InvalidConfiguration(
            "a spectrum needs at least one axis".to_string(),
        ));
    }
    Ok(axes.iter().map(Axis::n_bins).product())
}
