//! # sp-stat
//!
//! Statistical comparison engine for SpecStat: goodness-of-fit test
//! statistics between an observed and an expected binned spectrum, with an
//! optional nuisance-parameter penalty sum.
//!
//! The engine is pure and stateless per call; arbitrarily many comparisons
//! may run concurrently without coordination.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chi_squared;

pub use chi_squared::{
    log_likelihood, neyman_chi_squared, pearson_chi_squared, ChiSquared, PenaltyTerm,
    PenaltyTerms, TestStatistic,
};
