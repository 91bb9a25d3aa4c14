//! SpecStat CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sp_core::store;
use sp_smear::{Resolution, Smearer};
use sp_stat::{ChiSquared, PenaltyTerms};

#[derive(Parser)]
#[command(name = "specstat")]
#[command(about = "SpecStat - spectral smearing and goodness-of-fit statistics")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply detector-resolution smearing to a spectrum file
    Smear {
        /// Smearing method
        #[arg(short = 'm', long, value_enum, default_value_t = SmearMethod::Weight)]
        smear_method: SmearMethod,

        /// Fixed fractional energy resolution, e.g. 0.05 for 5 percent.
        /// The light-yield model is used when omitted.
        #[arg(short = 'r', long)]
        energy_resolution: Option<f64>,

        /// Worker count for the parallel methods
        #[arg(long, default_value = "4")]
        workers: usize,

        /// Random seed for the random methods
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Input spectrum file (JSON)
        path: PathBuf,
    },

    /// Compute a goodness-of-fit statistic between two spectrum files
    Compare {
        /// Test statistic kind (pearson, neyman, poisson_likelihood)
        #[arg(short = 's', long, default_value = "poisson_likelihood")]
        statistic: String,

        /// JSON file mapping penalty-term names to {parameter_value, sigma}
        #[arg(long)]
        penalties: Option<PathBuf>,

        /// Output file for the result (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Observed spectrum file (JSON)
        observed: PathBuf,

        /// Expected spectrum file (JSON)
        expected: PathBuf,
    },
}

/// Smearing method selector.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum SmearMethod {
    /// Deterministic weighted convolution
    Weight,
    /// Stochastic Gaussian resampling
    Random,
    /// Weighted convolution across parallel workers
    WeightParallel,
    /// Random resampling across parallel workers
    RandomParallel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Smear { smear_method, energy_resolution, workers, seed, path } => {
            cmd_smear(smear_method, energy_resolution, workers, seed, &path)
        }
        Commands::Compare { statistic, penalties, output, observed, expected } => {
            cmd_compare(&statistic, penalties.as_deref(), output.as_ref(), &observed, &expected)
        }
    }
}

/// Axes smeared by the `smear` command, in pipeline order.
const SMEARED_AXES: [&str; 2] = ["energy", "radius"];

fn cmd_smear(
    method: SmearMethod,
    energy_resolution: Option<f64>,
    workers: usize,
    seed: u64,
    path: &Path,
) -> Result<()> {
    let resolution = match energy_resolution {
        Some(fraction) => Resolution::Fractional(fraction),
        None => Resolution::default(),
    };
    let smearer = Smearer::new(resolution)?;

    tracing::info!(path = %path.display(), "loading spectrum");
    let mut spectrum = store::load(path)?;

    for axis in SMEARED_AXES {
        if spectrum.axis(axis).is_none() {
            continue;
        }
        tracing::info!(axis, method = ?method, "smearing");
        spectrum = match method {
            SmearMethod::Weight => smearer.weighted_smear(&spectrum, axis)?,
            SmearMethod::Random => smearer.random_smear(&spectrum, axis, seed)?,
            SmearMethod::WeightParallel => {
                smearer.weighted_smear_parallel(&spectrum, axis, workers)?
            }
            SmearMethod::RandomParallel => {
                smearer.random_smear_parallel(&spectrum, axis, workers, seed)?
            }
        };
    }

    let out_path = smeared_path(path)?;
    store::dump(&out_path, &spectrum)?;
    tracing::info!(path = %out_path.display(), total = spectrum.total(), "smeared spectrum written");
    Ok(())
}

/// Sibling path with `_smeared` appended to the file stem.
fn smeared_path(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("input path has no usable file name")?;
    let mut name = format!("{stem}_smeared");
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    Ok(path.with_file_name(name))
}

fn cmd_compare(
    statistic: &str,
    penalties: Option<&Path>,
    output: Option<&PathBuf>,
    observed_path: &Path,
    expected_path: &Path,
) -> Result<()> {
    let penalty_terms: Option<PenaltyTerms> = match penalties {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading penalty terms from {}", path.display()))?;
            Some(serde_json::from_str(&json)?)
        }
        None => None,
    };
    let engine = ChiSquared::from_name(statistic, penalty_terms)?;

    let observed = store::load(observed_path)?;
    let expected = store::load(expected_path)?;
    let value = engine.compare(&observed, &expected, None)?;
    tracing::info!(statistic, value, "comparison complete");

    let result = serde_json::json!({
        "statistic": statistic,
        "value": value,
    });
    write_json(output, result)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
