//! Very Simple Ecosystem Model (VSEM)
//!
//! A toy carbon-cycle model with three pools (vegetation, root and soil carbon)
//! driven by daily photosynthetically active radiation (PAR). The model is stepped
//! explicitly one day at a time and reports net ecosystem exchange (NEE) alongside
//! the pool sizes.
//!
//! # Module Organisation
//!
//! - `parameters`: process parameters and initial pool sizes
//! - `forcing`: validated forcing series and the seasonal PAR generator
//! - `state`: the carbon pools advanced by the integrator
//! - `outputs`: daily fluxes and the output table
//! - `model`: the integrator (`simulate`, `step`, `Vsem`)

pub mod errors;
pub mod forcing;
pub mod model;
pub mod outputs;
pub mod parameters;
pub mod state;
pub mod variable;

/// Floating point type used for all model quantities.
pub type FloatValue = f64;

pub use errors::{VsemError, VsemResult};
pub use forcing::{Forcing, SeasonalPar};
pub use model::{simulate, simulate_from, step, PoolPolicy, Vsem};
pub use outputs::{DailyFluxes, OutputRow, OutputTable};
pub use parameters::VsemParameters;
pub use state::Pools;
pub use variable::Variable;
