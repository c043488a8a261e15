//! Very Simple Ecosystem Model (VSEM)
//!
//! Facade over the workspace crates:
//!
//! - [`vsem_core`]: the forward model (`simulate`)
//! - [`vsem_calibrate`]: likelihood, priors and posterior for an external sampler

pub use vsem_calibrate;
pub use vsem_core;

pub use vsem_calibrate::{log_likelihood, CalibrationConfig, Posterior};
pub use vsem_core::{simulate, Forcing, OutputTable, VsemParameters};
