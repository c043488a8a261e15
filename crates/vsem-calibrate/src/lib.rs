//! Calibration support for VSEM
//!
//! Provides everything an external Bayesian sampler needs to calibrate the
//! Very Simple Ecosystem Model against observations:
//!
//! - `target`: observation table and explicit per-variable observation masks
//! - `likelihood`: heteroscedastic Gaussian log-likelihood
//! - `parameter_set`: reference values, bounds and uniform priors
//! - `model_runner`: maps calibrated parameter vectors onto model runs
//! - `posterior`: log-prior + log-likelihood for a parameter vector
//! - `synthetic`: synthetic observations for twin experiments
//! - `config`: TOML configuration of a calibration setup
//!
//! The sampler itself is not part of this crate.

pub mod config;
pub mod likelihood;
pub mod model_runner;
pub mod parameter_set;
pub mod posterior;
pub mod synthetic;
pub mod target;

use thiserror::Error;
use vsem_core::{Variable, VsemError};

pub use config::CalibrationConfig;
pub use likelihood::{log_likelihood, HeteroscedasticGaussian, LikelihoodFn, LikelihoodSettings};
pub use model_runner::{ModelRun, ModelRunner, VsemRunner};
pub use parameter_set::{
    CalibrationParameters, ParameterBounds, ParameterSet, ReferenceParameters, Uniform,
};
pub use posterior::Posterior;
pub use target::{ObservationMask, ObservationTable, Target};

/// Errors raised while evaluating a calibration.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] VsemError),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Shape mismatch for {what}. Expected {expected}, got {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("Observation of {variable} on day {day} is not finite")]
    InvalidObservation { variable: Variable, day: usize },
    #[error("Simulated {variable} on day {day} is not finite")]
    InvalidPrediction { variable: Variable, day: usize },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
