//! Daily forcing for VSEM.
//!
//! The only driver of the model is photosynthetically active radiation (PAR).
//! [`Forcing`] holds a validated series and [`SeasonalPar`] generates the
//! synthetic seasonal series used for twin experiments.

use crate::errors::{VsemError, VsemResult};
use crate::FloatValue;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Index;

/// Days in the seasonal cycle of [`SeasonalPar`].
pub const DAYS_PER_YEAR: FloatValue = 365.0;

/// Validated daily PAR series.
///
/// unit: MJ / m^2 / day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FloatValue>", into = "Vec<FloatValue>")]
pub struct Forcing {
    par: Vec<FloatValue>,
}

impl Forcing {
    /// Create a forcing series.
    ///
    /// Every value must be finite and non-negative. An empty series is valid
    /// and simulates zero days.
    pub fn new(par: Vec<FloatValue>) -> VsemResult<Self> {
        if let Some((day, value)) = par
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(VsemError::InvalidForcing(format!(
                "PAR on day {} is {}; values must be finite and non-negative",
                day, value
            )));
        }
        Ok(Self { par })
    }

    /// A series with no light on any day.
    pub fn zeros(days: usize) -> VsemResult<Self> {
        Self::constant(days, 0.0)
    }

    /// A series with the same PAR every day.
    pub fn constant(days: usize, value: FloatValue) -> VsemResult<Self> {
        Self::new(vec![value; days])
    }

    /// Number of simulated days.
    pub fn len(&self) -> usize {
        self.par.len()
    }

    pub fn is_empty(&self) -> bool {
        self.par.is_empty()
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.par
    }

    pub fn iter(&self) -> impl Iterator<Item = FloatValue> + '_ {
        self.par.iter().copied()
    }
}

impl Index<usize> for Forcing {
    type Output = FloatValue;

    fn index(&self, day: usize) -> &Self::Output {
        &self.par[day]
    }
}

impl TryFrom<Vec<FloatValue>> for Forcing {
    type Error = VsemError;

    fn try_from(par: Vec<FloatValue>) -> Result<Self, Self::Error> {
        Forcing::new(par)
    }
}

impl From<Forcing> for Vec<FloatValue> {
    fn from(forcing: Forcing) -> Self {
        forcing.par
    }
}

/// Generator for a synthetic seasonal PAR series.
///
/// For day $d = 1 \ldots N$:
/// $$ \text{PAR}_d = \left| A \sin\left(\frac{\pi d}{365}\right) + \varepsilon_d \right|, \quad \varepsilon_d \sim \mathcal{N}(0, \sigma) $$
///
/// The noise is drawn from a seeded generator so a given configuration always
/// produces the same series. With `noise_sd = 0` the series is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalPar {
    /// Peak seasonal PAR
    /// unit: MJ / m^2 / day
    /// default: 10.0
    pub amplitude: FloatValue,
    /// Standard deviation of the daily noise
    /// unit: MJ / m^2 / day
    /// default: 1.0
    pub noise_sd: FloatValue,
    /// Seed for the noise generator
    /// default: 42
    pub seed: u64,
}

impl Default for SeasonalPar {
    fn default() -> Self {
        Self {
            amplitude: 10.0,
            noise_sd: 1.0,
            seed: 42,
        }
    }
}

impl SeasonalPar {
    /// Noise-free seasonal cycle with the given amplitude.
    pub fn deterministic(amplitude: FloatValue) -> Self {
        Self {
            amplitude,
            noise_sd: 0.0,
            ..Default::default()
        }
    }

    /// Mean seasonal signal on a given (1-based) day, before noise.
    pub fn seasonal_signal(&self, day: usize) -> FloatValue {
        self.amplitude * (PI * day as FloatValue / DAYS_PER_YEAR).sin()
    }

    /// Generate a series covering `days` days.
    pub fn generate(&self, days: usize) -> VsemResult<Forcing> {
        if !self.amplitude.is_finite() {
            return Err(VsemError::InvalidForcing(format!(
                "seasonal amplitude must be finite, got {}",
                self.amplitude
            )));
        }
        let noise = Normal::new(0.0, self.noise_sd).map_err(|e| {
            VsemError::InvalidForcing(format!("invalid noise_sd {}: {}", self.noise_sd, e))
        })?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let par = (1..=days)
            .map(|day| (self.seasonal_signal(day) + noise.sample(&mut rng)).abs())
            .collect();

        Forcing::new(par)
    }
}
