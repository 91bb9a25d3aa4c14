//! Spectrum persistence.
//!
//! The on-disk representation is kept separate from the domain type and is
//! converted through the validated constructors, so a malformed file surfaces
//! a configuration or shape error instead of an invariant-violating
//! [`Spectrum`]. `dump` followed by `load` round-trips a spectrum exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::spectrum::{Axis, Spectrum};

/// On-disk axis definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisDef {
    /// Axis name (`"energy"`, `"radius"`, ...).
    pub name: String,
    /// Lower range edge (inclusive).
    pub low: f64,
    /// Upper range edge (exclusive).
    pub high: f64,
    /// Number of bins.
    pub n_bins: usize,
}

/// On-disk spectrum representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumFile {
    /// Axes, slowest-varying first.
    pub axes: Vec<AxisDef>,
    /// Row-major flat bin contents.
    pub data: Vec<f64>,
}

impl SpectrumFile {
    /// Convert into a validated domain spectrum.
    pub fn into_spectrum(self) -> Result<Spectrum> {
        let axes = self
            .axes
            .into_iter()
            .map(|a| Axis::new(a.name, a.low, a.high, a.n_bins))
            .collect::<Result<Vec<_>>>()?;
        Spectrum::with_data(axes, self.data)
    }
}

impl From<&Spectrum> for SpectrumFile {
    fn from(spectrum: &Spectrum) -> Self {
        Self {
            axes: spectrum
                .axes()
                .iter()
                .map(|a| AxisDef {
                    name: a.name().to_string(),
                    low: a.low(),
                    high: a.high(),
                    n_bins: a.n_bins(),
                })
                .collect(),
            data: spectrum.data().to_vec(),
        }
    }
}

/// Load a spectrum from a JSON file.
pub fn load(path: &Path) -> Result<Spectrum> {
    let json = std::fs::read_to_string(path)?;
    let file: SpectrumFile = serde_json::from_str(&json)?;
    file.into_spectrum()
}

/// Write a spectrum to a JSON file (pretty-printed).
pub fn dump(path: &Path, spectrum: &Spectrum) -> Result<()> {
    let file = SpectrumFile::from(spectrum);
    std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}
