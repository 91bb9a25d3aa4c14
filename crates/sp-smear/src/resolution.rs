//! Detector resolution models.

use sp_core::{Error, Result};

/// Default light yield, in detected hits per MeV.
pub const DEFAULT_LIGHT_YIELD: f64 = 200.0;

/// Per-dimension Gaussian resolution model.
///
/// Exactly one model is active per smearing configuration; it maps a bin's
/// representative value to the Gaussian width used to redistribute that bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Fixed fractional resolution: `sigma = fraction * value`.
    Fractional(f64),
    /// Photon-statistics resolution: `sigma = sqrt(value / light_yield)`.
    LightYield(f64),
    /// Constant absolute resolution in axis units (position resolutions).
    Fixed(f64),
}

impl Resolution {
    /// Validate the model parameter.
    pub fn validate(&self) -> Result<()> {
        let (label, value) = match *self {
            Resolution::Fractional(f) => ("fractional resolution", f),
            Resolution::LightYield(ly) => ("light yield", ly),
            Resolution::Fixed(s) => ("fixed sigma", s),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "{} must be finite and > 0, got {}",
                label, value
            )));
        }
        Ok(())
    }

    /// Gaussian width at the given axis value.
    ///
    /// Fails when the derived sigma is not strictly positive, which would
    /// make the Gaussian redistribution degenerate.
    pub fn sigma(&self, value: f64) -> Result<f64> {
        let sigma = match *self {
            Resolution::Fractional(f) => f * value,
            Resolution::LightYield(ly) => (value / ly).sqrt(),
            Resolution::Fixed(s) => s,
        };
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "resolution model produced sigma {} at value {}; sigma must be > 0",
                sigma, value
            )));
        }
        Ok(sigma)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::LightYield(DEFAULT_LIGHT_YIELD)
    }
}
