//! Gaussian spectral smearing.
//!
//! Smearing redistributes content along one selected axis only; all other
//! coordinates stay fixed. Both modes share the same edge policy: probability
//! mass (or draws) falling outside the axis range is discarded, never
//! reinjected, so the total content is not exactly conserved when the
//! resolution reaches the range edges.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use sp_core::{Axis, Error, Result, Spectrum};
use statrs::distribution::ContinuousCDF;

use crate::resolution::Resolution;

/// Gaussian smearing engine over one validated [`Resolution`] model.
#[derive(Debug, Clone, Copy)]
pub struct Smearer {
    resolution: Resolution,
}

impl Smearer {
    /// Create a smearer, validating the resolution model up front.
    pub fn new(resolution: Resolution) -> Result<Self> {
        resolution.validate()?;
        Ok(Self { resolution })
    }

    /// The active resolution model.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Deterministic Gaussian smearing along the named axis.
    ///
    /// Every source bin's content is spread over the target bins by the
    /// Gaussian probability mass integrated across each target bin (CDF
    /// difference at the bin edges). Mass outside the axis range leaks.
    pub fn weighted_smear(&self, spectrum: &Spectrum, axis: &str) -> Result<Spectrum> {
        let (k, ax) = axis_info(spectrum, axis)?;
        let rows = self.transfer_rows(ax)?;
        let out = smear_partition(spectrum, k, &rows, 0..ax.n_bins());
        Spectrum::with_data(spectrum.axes().to_vec(), out)
    }

    /// Parallel [`Smearer::weighted_smear`].
    ///
    /// Source bins are partitioned into `workers` contiguous chunks; each
    /// chunk's contribution grid is computed independently and the grids are
    /// summed element-wise in chunk order. Agrees with the serial result up
    /// to floating-point associativity, for any worker count.
    pub fn weighted_smear_parallel(
        &self,
        spectrum: &Spectrum,
        axis: &str,
        workers: usize,
    ) -> Result<Spectrum> {
        let (k, ax) = axis_info(spectrum, axis)?;
        let chunks = partition(ax.n_bins(), workers)?;
        let rows = self.transfer_rows(ax)?;
        let partials: Vec<Vec<f64>> = chunks
            .into_par_iter()
            .map(|bins| smear_partition(spectrum, k, &rows, bins))
            .collect();
        let out = sum_grids(partials, spectrum.data().len());
        Spectrum::with_data(spectrum.axes().to_vec(), out)
    }

    /// Stochastic Gaussian smearing along the named axis, reproducible from
    /// `seed`.
    ///
    /// Each source bin's content is resolved to a discrete draw count by
    /// stochastic rounding (`floor(c)` draws plus one more with probability
    /// `frac(c)`); each draw samples the bin's Gaussian and is re-binned.
    /// Draws landing outside the axis range are dropped.
    pub fn random_smear(&self, spectrum: &Spectrum, axis: &str, seed: u64) -> Result<Spectrum> {
        let (k, ax) = axis_info(spectrum, axis)?;
        let samplers = self.samplers(ax)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let out = sample_partition(spectrum, k, &samplers, 0..ax.n_bins(), &mut rng);
        Spectrum::with_data(spectrum.axes().to_vec(), out)
    }

    /// Parallel [`Smearer::random_smear`].
    ///
    /// Chunk `w` draws from an independent generator seeded `seed + w`, so
    /// partitions share no mutable random state. The result is statistically
    /// equivalent to, not identical with, the serial one.
    pub fn random_smear_parallel(
        &self,
        spectrum: &Spectrum,
        axis: &str,
        workers: usize,
        seed: u64,
    ) -> Result<Spectrum> {
        let (k, ax) = axis_info(spectrum, axis)?;
        let chunks = partition(ax.n_bins(), workers)?;
        let samplers = self.samplers(ax)?;
        let partials: Vec<Vec<f64>> = chunks
            .into_par_iter()
            .enumerate()
            .map(|(w, bins)| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(w as u64));
                sample_partition(spectrum, k, &samplers, bins, &mut rng)
            })
            .collect();
        let out = sum_grids(partials, spectrum.data().len());
        Spectrum::with_data(spectrum.axes().to_vec(), out)
    }

    /// Gaussian transfer rows for one axis: element `i * n + j` is the
    /// probability mass moved from source bin `i` to target bin `j`. Each row
    /// sums to at most 1; the deficit is the mass leaked outside the range.
    fn transfer_rows(&self, axis: &Axis) -> Result<Vec<f64>> {
        let n = axis.n_bins();
        let mut rows = vec![0.0; n * n];
        for i in 0..n {
            let centre = axis.bin_centre(i);
            let sigma = self.resolution.sigma(centre)?;
            let gauss = statrs::distribution::Normal::new(centre, sigma)
                .map_err(|e| gaussian_error(centre, sigma, e))?;
            let mut cdf_lo = gauss.cdf(axis.bin_edge(0));
            for j in 0..n {
                let cdf_hi = gauss.cdf(axis.bin_edge(j + 1));
                // Far-tail CDF differences can go negative by an ulp.
                rows[i * n + j] = (cdf_hi - cdf_lo).max(0.0);
                cdf_lo = cdf_hi;
            }
        }
        Ok(rows)
    }

    /// One seedable Gaussian sampler per source bin.
    fn samplers(&self, axis: &Axis) -> Result<Vec<Normal<f64>>> {
        (0..axis.n_bins())
            .map(|i| {
                let centre = axis.bin_centre(i);
                let sigma = self.resolution.sigma(centre)?;
                Normal::new(centre, sigma).map_err(|e| gaussian_error(centre, sigma, e))
            })
            .collect()
    }
}

fn gaussian_error(centre: f64, sigma: f64, err: impl std::fmt::Display) -> Error {
    Error::InvalidConfiguration(format!(
        "Gaussian with mean {}, sigma {}: {}",
        centre, sigma, err
    ))
}

fn axis_info<'a>(spectrum: &'a Spectrum, axis: &str) -> Result<(usize, &'a Axis)> {
    spectrum.axis(axis).ok_or_else(|| {
        Error::InvalidConfiguration(format!("spectrum has no axis named '{}'", axis))
    })
}

/// Split `0..n_bins` into `workers` contiguous chunks (the trailing chunks
/// may be short or empty when the count does not divide evenly).
fn partition(n_bins: usize, workers: usize) -> Result<Vec<Range<usize>>> {
    if workers == 0 {
        return Err(Error::InvalidConfiguration("worker count must be >= 1".to_string()));
    }
    let chunk = n_bins.div_ceil(workers);
    Ok((0..workers)
        .map(|w| {
            let start = (w * chunk).min(n_bins);
            let end = ((w + 1) * chunk).min(n_bins);
            start..end
        })
        .collect())
}

/// Weighted contribution of the source bins in `bins` to the output grid.
fn smear_partition(spectrum: &Spectrum, k: usize, rows: &[f64], bins: Range<usize>) -> Vec<f64> {
    let n = spectrum.axes()[k].n_bins();
    let stride = spectrum.stride(k);
    let data = spectrum.data();
    let mut out = vec![0.0; data.len()];
    for (flat, &content) in data.iter().enumerate() {
        if content == 0.0 {
            continue;
        }
        let i = (flat / stride) % n;
        if !bins.contains(&i) {
            continue;
        }
        let base = flat - i * stride;
        let row = &rows[i * n..(i + 1) * n];
        for (j, &mass) in row.iter().enumerate() {
            out[base + j * stride] += content * mass;
        }
    }
    out
}

/// Random-draw contribution of the source bins in `bins` to the output grid.
fn sample_partition(
    spectrum: &Spectrum,
    k: usize,
    samplers: &[Normal<f64>],
    bins: Range<usize>,
    rng: &mut StdRng,
) -> Vec<f64> {
    let ax = &spectrum.axes()[k];
    let n = ax.n_bins();
    let stride = spectrum.stride(k);
    let mut out = vec![0.0; spectrum.data().len()];
    for (flat, &content) in spectrum.data().iter().enumerate() {
        if content == 0.0 {
            continue;
        }
        let i = (flat / stride) % n;
        if !bins.contains(&i) {
            continue;
        }
        let base = flat - i * stride;
        let mut draws = content.floor() as u64;
        let frac = content - content.floor();
        if frac > 0.0 && rng.random_bool(frac) {
            draws += 1;
        }
        for _ in 0..draws {
            let value = samplers[i].sample(rng);
            if let Some(j) = ax.bin_index(value) {
                out[base + j * stride] += 1.0;
            }
        }
    }
    out
}

/// Element-wise sum of per-chunk grids, in chunk order.
fn sum_grids(partials: Vec<Vec<f64>>, len: usize) -> Vec<f64> {
    let mut out = vec![0.0; len];
    for partial in partials {
        for (acc, v) in out.iter_mut().zip(partial) {
            *acc += v;
        }
    }
    out
}
