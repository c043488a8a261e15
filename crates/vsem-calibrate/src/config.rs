//! Calibration configuration.
//!
//! A calibration setup is described by a TOML document. Every field has a
//! default so a partial document only overrides what it names:
//!
//! ```toml
//! days = 730
//! selection = ["light_extinction", "light_use_efficiency", "error_scale"]
//! pool_observation_interval = 10
//!
//! [forcing]
//! amplitude = 10.0
//! noise_sd = 1.0
//!
//! [likelihood]
//! nee_sd_floor = 1e-4
//! ```

use crate::likelihood::{HeteroscedasticGaussian, LikelihoodSettings};
use crate::model_runner::VsemRunner;
use crate::parameter_set::{ReferenceParameters, ERROR_SCALE};
use crate::posterior::Posterior;
use crate::synthetic;
use crate::target::{ObservationMask, Target};
use crate::{Error, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use vsem_core::{PoolPolicy, SeasonalPar, Variable, Vsem};

/// Settings of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Simulation horizon
    /// unit: day
    /// default: 730
    pub days: usize,

    /// Reference parameters that are calibrated, in vector order
    pub selection: Vec<String>,

    /// Pools are observed on every nth day; NEE is observed daily
    /// default: 10
    pub pool_observation_interval: usize,

    /// Seed for the synthetic observation noise
    /// default: 123
    pub observation_seed: u64,

    /// Handling of negative pools
    pub policy: PoolPolicy,

    /// Seasonal PAR generator
    pub forcing: SeasonalPar,

    /// Error model
    pub likelihood: LikelihoodSettings,

    /// Best values and bounds of every parameter
    pub reference: ReferenceParameters,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            days: 730,
            selection: [
                "light_extinction",
                "leaf_area_ratio",
                "light_use_efficiency",
                "respiration_fraction",
                "tau_vegetation",
                "tau_soil",
                ERROR_SCALE,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            pool_observation_interval: 10,
            observation_seed: 123,
            policy: PoolPolicy::default(),
            forcing: SeasonalPar::default(),
            likelihood: LikelihoodSettings::default(),
            reference: ReferenceParameters::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.days == 0 {
            return Err(Error::Config("days must be at least 1".to_string()));
        }
        if self.pool_observation_interval == 0 {
            return Err(Error::Config(
                "pool_observation_interval must be at least 1".to_string(),
            ));
        }
        if self.selection.is_empty() {
            return Err(Error::Config(
                "at least one parameter must be selected".to_string(),
            ));
        }
        self.likelihood.validate()?;
        self.reference.validate()?;
        // Unknown or repeated names
        self.reference.parameter_set(&self.selection)?;
        Ok(())
    }

    /// Observation mask: NEE daily, pools every `pool_observation_interval` days.
    pub fn observation_mask(&self) -> ObservationMask {
        [Variable::Vegetation, Variable::Soil, Variable::Root]
            .into_iter()
            .fold(ObservationMask::all(), |mask, variable| {
                mask.with_every_nth(variable, self.pool_observation_interval, self.days)
            })
    }

    /// Build a twin experiment.
    ///
    /// The reference best values generate synthetic observations through the
    /// likelihood's error model, and the posterior over the selected parameters
    /// is returned ready for evaluation.
    pub fn twin_experiment(&self) -> Result<Posterior<VsemRunner, HeteroscedasticGaussian>> {
        self.validate()?;

        let forcing = self.forcing.generate(self.days)?;
        let truth = self.reference.best()?;
        let outputs = Vsem::from_parameters(truth.model)?
            .with_policy(self.policy)
            .run(&forcing)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.observation_seed);
        let observations =
            synthetic::observe(&outputs, truth.error_scale, &self.likelihood, &mut rng)?;
        let target = Target::new(observations, self.observation_mask())?;

        debug!(
            days = self.days,
            n_params = self.selection.len(),
            n_observed = target.n_observed(&self.likelihood.variables),
            "Built twin experiment"
        );

        let params = self.reference.parameter_set(&self.selection)?;
        let runner = VsemRunner::new(forcing, self.reference.clone(), self.selection.clone())?
            .with_policy(self.policy);
        let likelihood = HeteroscedasticGaussian::new(self.likelihood.clone())?;

        Posterior::new(params, runner, likelihood, target)
    }
}
