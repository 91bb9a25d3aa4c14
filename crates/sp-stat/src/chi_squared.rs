//! Goodness-of-fit test statistics.
//!
//! Three per-bin statistics over observed (`O`) and expected (`E`) contents:
//!
//! - Pearson: `(O - E)^2 / E`
//! - Neyman: `(O - E)^2 / O`
//! - Poisson log-likelihood ratio: `(E - O) + O * ln(O / E)`
//!
//! Zero-valued bins feeding a log or division recover locally: the log term
//! is 0 when `O = 0`, and a bin whose denominator is 0 contributes 0. These
//! degeneracies are never surfaced as errors.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sp_core::{Error, Result, Spectrum};

fn check_lengths(observed: &[f64], expected: &[f64]) -> Result<()> {
    if observed.len() != expected.len() {
        return Err(Error::ShapeMismatch(format!(
            "observed has {} bins, expected has {}",
            observed.len(),
            expected.len()
        )));
    }
    Ok(())
}

/// Pearson chi-squared: sum of `(O - E)^2 / E`. Bins with `E = 0` contribute 0.
pub fn pearson_chi_squared(observed: &[f64], expected: &[f64]) -> Result<f64> {
    check_lengths(observed, expected)?;
    Ok(observed
        .iter()
        .zip(expected)
        .filter(|&(_, &e)| e != 0.0)
        .map(|(&o, &e)| (o - e) * (o - e) / e)
        .sum())
}

/// Neyman chi-squared: sum of `(O - E)^2 / O`. Bins with `O = 0` contribute 0.
pub fn neyman_chi_squared(observed: &[f64], expected: &[f64]) -> Result<f64> {
    check_lengths(observed, expected)?;
    Ok(observed
        .iter()
        .zip(expected)
        .filter(|&(&o, _)| o != 0.0)
        .map(|(&o, &e)| (o - e) * (o - e) / o)
        .sum())
}

/// Poisson log-likelihood ratio sum: `(E - O) + O * ln(O / E)` over all bins.
///
/// This is the single (not doubled) sum; the likelihood-ratio convention of
/// doubling is applied by [`ChiSquared::get_chi_squared`]. The log term is 0
/// when `O = 0`; bins with `E = 0` and `O > 0` contribute 0.
pub fn log_likelihood(observed: &[f64], expected: &[f64]) -> Result<f64> {
    check_lengths(observed, expected)?;
    let mut total = 0.0;
    for (&o, &e) in observed.iter().zip(expected) {
        if o == 0.0 {
            total += e;
        } else if e != 0.0 {
            total += (e - o) + o * (o / e).ln();
        }
    }
    Ok(total)
}

/// Test-statistic kind, closed over the three supported statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatistic {
    /// Pearson chi-squared.
    Pearson,
    /// Neyman chi-squared.
    Neyman,
    /// Poisson likelihood ratio (doubled in the engine total).
    PoissonLikelihood,
}

impl FromStr for TestStatistic {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "pearson" => Ok(TestStatistic::Pearson),
            "neyman" => Ok(TestStatistic::Neyman),
            "poisson_likelihood" => Ok(TestStatistic::PoissonLikelihood),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown test statistic '{}' (expected pearson, neyman or poisson_likelihood)",
                other
            ))),
        }
    }
}

/// Nuisance-parameter penalty: contributes `(parameter_value / sigma)^2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTerm {
    /// Deviation of the nuisance parameter from its nominal value.
    pub parameter_value: f64,
    /// Gaussian constraint width; 1.0 when unspecified.
    #[serde(default = "default_sigma")]
    pub sigma: f64,
}

fn default_sigma() -> f64 {
    1.0
}

impl PenaltyTerm {
    /// Penalty term with the default unit sigma.
    pub fn new(parameter_value: f64) -> Self {
        Self { parameter_value, sigma: 1.0 }
    }

    /// Penalty term with an explicit sigma.
    pub fn with_sigma(parameter_value: f64, sigma: f64) -> Self {
        Self { parameter_value, sigma }
    }
}

/// Mapping of penalty-term name to definition. Keys are unique; the result
/// does not depend on ordering.
pub type PenaltyTerms = HashMap<String, PenaltyTerm>;

fn penalty_sum(terms: &PenaltyTerms) -> Result<f64> {
    let mut total = 0.0;
    for (name, term) in terms {
        if !term.sigma.is_finite() || term.sigma == 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "penalty term '{}' has sigma {}; sigma must be finite and non-zero",
                name, term.sigma
            )));
        }
        let pull = term.parameter_value / term.sigma;
        total += pull * pull;
    }
    Ok(total)
}

/// Configured comparison engine: one statistic kind plus a default
/// penalty-term mapping, both immutable after construction.
#[derive(Debug, Clone)]
pub struct ChiSquared {
    statistic: TestStatistic,
    penalty_terms: PenaltyTerms,
}

impl ChiSquared {
    /// Engine with no default penalty terms.
    pub fn new(statistic: TestStatistic) -> Self {
        Self { statistic, penalty_terms: PenaltyTerms::new() }
    }

    /// Engine with a default penalty-term mapping.
    pub fn with_penalty_terms(statistic: TestStatistic, penalty_terms: PenaltyTerms) -> Self {
        Self { statistic, penalty_terms }
    }

    /// Engine from a statistic kind name, rejecting unknown names here
    /// rather than at first use.
    pub fn from_name(name: &str, penalty_terms: Option<PenaltyTerms>) -> Result<Self> {
        let statistic = name.parse()?;
        Ok(Self { statistic, penalty_terms: penalty_terms.unwrap_or_default() })
    }

    /// The configured statistic kind.
    pub fn statistic(&self) -> TestStatistic {
        self.statistic
    }

    /// Goodness-of-fit total over flat bin contents.
    ///
    /// For [`TestStatistic::PoissonLikelihood`] the total is twice the
    /// log-likelihood sum plus the penalty sum; for the chi-squared kinds it
    /// is the plain per-bin sum plus the penalty sum.
    ///
    /// A call-supplied `penalty_terms` mapping replaces the configured
    /// default in its entirety for this call; it is never merged.
    pub fn get_chi_squared(
        &self,
        observed: &[f64],
        expected: &[f64],
        penalty_terms: Option<&PenaltyTerms>,
    ) -> Result<f64> {
        let base = match self.statistic {
            TestStatistic::Pearson => pearson_chi_squared(observed, expected)?,
            TestStatistic::Neyman => neyman_chi_squared(observed, expected)?,
            TestStatistic::PoissonLikelihood => 2.0 * log_likelihood(observed, expected)?,
        };
        let active = penalty_terms.unwrap_or(&self.penalty_terms);
        Ok(base + penalty_sum(active)?)
    }

    /// [`ChiSquared::get_chi_squared`] over two spectra, requiring identical
    /// axes (names, ranges and binning).
    pub fn compare(
        &self,
        observed: &Spectrum,
        expected: &Spectrum,
        penalty_terms: Option<&PenaltyTerms>,
    ) -> Result<f64> {
        if !observed.same_shape(expected) {
            return Err(Error::ShapeMismatch(
                "observed and expected spectra have different axes".to_string(),
            ));
        }
        self.get_chi_squared(observed.data(), expected.data(), penalty_terms)
    }
}
