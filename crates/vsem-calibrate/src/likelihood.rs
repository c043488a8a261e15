//! Heteroscedastic Gaussian likelihood.
//!
//! Each observed value is compared with the simulated value on the same day under
//! an independent Gaussian error whose standard deviation scales with the size of
//! the prediction:
//!
//! $$ \sigma = (|\hat{y}| + \epsilon) \cdot s $$
//!
//! where $s$ is the calibrated error scale. NEE crosses zero, so its standard
//! deviation is additionally bounded below by a floor:
//!
//! $$ \sigma_{NEE} = \max\left((|\hat{y}| + \epsilon) \cdot s, \sigma_{floor}\right) $$
//!
//! The log-likelihood is the sum of the Gaussian log-densities of all observed
//! residuals.

use crate::target::{ObservationMask, ObservationTable, Target};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use vsem_core::{FloatValue, OutputTable, Variable};

/// $\ln \sqrt{2\pi}$
const LN_SQRT_2PI: FloatValue = 0.918_938_533_204_672_8;

/// Settings of the error model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodSettings {
    /// Offset added to |prediction| so pools at zero keep a positive uncertainty
    /// default: 1e-7
    pub epsilon: FloatValue,

    /// Lower bound on the NEE standard deviation
    /// unit: kg C / m^2 / day
    /// default: 1e-4
    pub nee_sd_floor: FloatValue,

    /// Variables that contribute to the likelihood
    /// default: all four
    pub variables: Vec<Variable>,
}

impl Default for LikelihoodSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-7,
            nee_sd_floor: 1e-4,
            variables: Variable::ALL.to_vec(),
        }
    }
}

impl LikelihoodSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "likelihood epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if !(self.nee_sd_floor.is_finite() && self.nee_sd_floor >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "NEE standard deviation floor must be non-negative and finite, got {}",
                self.nee_sd_floor
            )));
        }
        let unique: BTreeSet<_> = self.variables.iter().collect();
        if unique.len() != self.variables.len() {
            return Err(Error::InvalidParameter(
                "likelihood variables must not repeat".to_string(),
            ));
        }
        Ok(())
    }

    /// Standard deviation of the error on a predicted value.
    pub fn standard_deviation(
        &self,
        variable: Variable,
        predicted: FloatValue,
        error_scale: FloatValue,
    ) -> FloatValue {
        let sd = (predicted.abs() + self.epsilon) * error_scale;
        if variable.is_flux() {
            sd.max(self.nee_sd_floor)
        } else {
            sd
        }
    }
}

/// Log-density of a zero-mean Gaussian with standard deviation `sd` at `residual`.
pub fn gaussian_log_density(residual: FloatValue, sd: FloatValue) -> FloatValue {
    let z = residual / sd;
    -LN_SQRT_2PI - sd.ln() - 0.5 * z * z
}

fn check_error_scale(error_scale: FloatValue) -> Result<()> {
    if !(error_scale.is_finite() && error_scale > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "error_scale must be positive and finite, got {}",
            error_scale
        )));
    }
    Ok(())
}

fn check_shapes(
    outputs: &OutputTable,
    observations: &ObservationTable,
    mask: &ObservationMask,
) -> Result<()> {
    if observations.len() != outputs.len() {
        return Err(Error::ShapeMismatch {
            what: "observation table".to_string(),
            expected: outputs.len(),
            found: observations.len(),
        });
    }
    mask.validate(outputs.len())
}

/// Log-likelihood contribution of a single variable.
pub fn variable_log_likelihood(
    outputs: &OutputTable,
    observations: &ObservationTable,
    mask: &ObservationMask,
    variable: Variable,
    error_scale: FloatValue,
    settings: &LikelihoodSettings,
) -> Result<FloatValue> {
    check_error_scale(error_scale)?;
    check_shapes(outputs, observations, mask)?;
    sum_log_densities(outputs, observations, mask, variable, error_scale, settings)
}

// Inputs are already checked for shape and error scale.
fn sum_log_densities(
    outputs: &OutputTable,
    observations: &ObservationTable,
    mask: &ObservationMask,
    variable: Variable,
    error_scale: FloatValue,
    settings: &LikelihoodSettings,
) -> Result<FloatValue> {
    let simulated = outputs.rows();
    let observed = observations.rows();
    let mut total = 0.0;

    for day in mask.observed_days(variable, outputs.len()) {
        let obs = observed[day].get(variable);
        if !obs.is_finite() {
            return Err(Error::InvalidObservation { variable, day });
        }
        let predicted = simulated[day].get(variable);
        if !predicted.is_finite() {
            return Err(Error::InvalidPrediction { variable, day });
        }
        let sd = settings.standard_deviation(variable, predicted, error_scale);
        total += gaussian_log_density(obs - predicted, sd);
    }

    Ok(total)
}

/// Aggregate log-likelihood of simulated output given observations.
///
/// Sums the per-row Gaussian log-densities of every observed value of every
/// variable in `settings.variables`. Misaligned inputs, invalid error scales and
/// non-finite values on observed days are reported as errors rather than
/// producing a non-finite value.
pub fn log_likelihood(
    outputs: &OutputTable,
    observations: &ObservationTable,
    mask: &ObservationMask,
    error_scale: FloatValue,
    settings: &LikelihoodSettings,
) -> Result<FloatValue> {
    settings.validate()?;
    check_error_scale(error_scale)?;
    check_shapes(outputs, observations, mask)?;

    let mut total = 0.0;
    for &variable in &settings.variables {
        total += sum_log_densities(
            outputs,
            observations,
            mask,
            variable,
            error_scale,
            settings,
        )?;
    }

    debug!(
        log_likelihood = total,
        error_scale,
        days = outputs.len(),
        "Evaluated likelihood"
    );

    Ok(total)
}

/// A likelihood comparing one model output with a calibration target.
pub trait LikelihoodFn {
    fn ln_likelihood(
        &self,
        outputs: &OutputTable,
        target: &Target,
        error_scale: FloatValue,
    ) -> Result<FloatValue>;
}

/// The heteroscedastic Gaussian likelihood as a [`LikelihoodFn`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeteroscedasticGaussian {
    settings: LikelihoodSettings,
}

impl HeteroscedasticGaussian {
    pub fn new(settings: LikelihoodSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &LikelihoodSettings {
        &self.settings
    }
}

impl LikelihoodFn for HeteroscedasticGaussian {
    fn ln_likelihood(
        &self,
        outputs: &OutputTable,
        target: &Target,
        error_scale: FloatValue,
    ) -> Result<FloatValue> {
        log_likelihood(
            outputs,
            &target.observations,
            &target.mask,
            error_scale,
            &self.settings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vsem_core::{simulate, DailyFluxes, Forcing, Pools, VsemParameters};

    fn outputs(days: usize) -> OutputTable {
        let forcing = Forcing::constant(days, 8.0).unwrap();
        simulate(&VsemParameters::default(), &forcing).unwrap()
    }

    #[test]
    fn log_density_of_standard_normal() {
        assert_relative_eq!(gaussian_log_density(0.0, 1.0), -LN_SQRT_2PI);
        assert_relative_eq!(gaussian_log_density(1.0, 1.0), -LN_SQRT_2PI - 0.5);
        assert_relative_eq!(
            gaussian_log_density(1.0, 2.0),
            -LN_SQRT_2PI - 2.0_f64.ln() - 0.125
        );
    }

    #[test]
    fn ln_sqrt_2pi_constant() {
        assert_relative_eq!(
            LN_SQRT_2PI,
            (2.0 * std::f64::consts::PI).sqrt().ln(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn pool_sd_scales_with_prediction() {
        let settings = LikelihoodSettings::default();
        let sd = settings.standard_deviation(Variable::Soil, 15.0, 0.1);
        assert_relative_eq!(sd, (15.0 + 1e-7) * 0.1);
        let sd = settings.standard_deviation(Variable::Soil, -2.0, 0.1);
        assert_relative_eq!(sd, (2.0 + 1e-7) * 0.1);
    }

    #[test]
    fn nee_sd_is_floored() {
        let settings = LikelihoodSettings::default();
        assert_eq!(
            settings.standard_deviation(Variable::Nee, 0.0, 0.1),
            settings.nee_sd_floor
        );
        // Above the floor the proportional rule applies
        assert_relative_eq!(
            settings.standard_deviation(Variable::Nee, 1.0, 0.1),
            (1.0 + 1e-7) * 0.1
        );
        // Pools are not floored
        assert!(settings.standard_deviation(Variable::Root, 0.0, 0.1) < settings.nee_sd_floor);
    }

    #[test]
    fn exact_match_is_finite() {
        let sim = outputs(20);
        let obs = ObservationTable::from_outputs(&sim);
        let ll = log_likelihood(
            &sim,
            &obs,
            &ObservationMask::all(),
            0.1,
            &LikelihoodSettings::default(),
        )
        .unwrap();
        assert!(ll.is_finite());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let sim = outputs(10);
        let obs = ObservationTable::from_outputs(&outputs(9));
        let result = log_likelihood(
            &sim,
            &obs,
            &ObservationMask::all(),
            0.1,
            &LikelihoodSettings::default(),
        );
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                expected: 10,
                found: 9,
                ..
            })
        ));
    }

    #[test]
    fn invalid_error_scale_is_rejected() {
        let sim = outputs(5);
        let obs = ObservationTable::from_outputs(&sim);
        for scale in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let result = log_likelihood(
                &sim,
                &obs,
                &ObservationMask::all(),
                scale,
                &LikelihoodSettings::default(),
            );
            assert!(
                matches!(result, Err(Error::InvalidParameter(_))),
                "scale {} should be rejected",
                scale
            );
        }
    }

    #[test]
    fn non_finite_observation_is_rejected_only_when_observed() {
        let sim = outputs(5);
        let mut rows = sim.rows().to_vec();
        rows[2].soil = f64::NAN;
        let obs = ObservationTable::new(rows);

        let result = log_likelihood(
            &sim,
            &obs,
            &ObservationMask::all(),
            0.1,
            &LikelihoodSettings::default(),
        );
        assert!(matches!(
            result,
            Err(Error::InvalidObservation {
                variable: Variable::Soil,
                day: 2
            })
        ));

        // Masking the day out makes the same table usable
        let mask = ObservationMask::all().with_days(Variable::Soil, [0, 1, 3, 4]);
        let ll = log_likelihood(&sim, &obs, &mask, 0.1, &LikelihoodSettings::default()).unwrap();
        assert!(ll.is_finite());
    }

    #[test]
    fn non_finite_prediction_is_rejected_only_when_observed() {
        let mut sim = OutputTable::with_capacity(3);
        sim.push(&DailyFluxes::default(), &Pools::new(3.0, 3.0, 15.0));
        sim.push(
            &DailyFluxes {
                nee: f64::NAN,
                ..Default::default()
            },
            &Pools::new(f64::INFINITY, 3.0, 15.0),
        );
        sim.push(&DailyFluxes::default(), &Pools::new(3.0, 3.0, 15.0));
        let mut rows = sim.rows().to_vec();
        rows[1] = rows[0];
        let obs = ObservationTable::new(rows);
        let settings = LikelihoodSettings::default();

        let result = log_likelihood(&sim, &obs, &ObservationMask::all(), 0.1, &settings);
        assert!(matches!(
            result,
            Err(Error::InvalidPrediction {
                variable: Variable::Nee,
                day: 1
            })
        ));
        let result = variable_log_likelihood(
            &sim,
            &obs,
            &ObservationMask::all(),
            Variable::Vegetation,
            0.1,
            &settings,
        );
        assert!(matches!(
            result,
            Err(Error::InvalidPrediction {
                variable: Variable::Vegetation,
                day: 1
            })
        ));

        let mask = ObservationMask::all()
            .with_days(Variable::Nee, [0, 2])
            .with_days(Variable::Vegetation, [0, 2]);
        let ll = log_likelihood(&sim, &obs, &mask, 0.1, &settings).unwrap();
        assert!(ll.is_finite());
    }

    #[test]
    fn settings_reject_repeated_variables() {
        let settings = LikelihoodSettings {
            variables: vec![Variable::Nee, Variable::Nee],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        assert!(HeteroscedasticGaussian::new(settings).is_err());
    }

    #[test]
    fn settings_reject_zero_epsilon() {
        let settings = LikelihoodSettings {
            epsilon: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn total_is_sum_of_variables() {
        let sim = outputs(30);
        let mut rows = sim.rows().to_vec();
        for row in rows.iter_mut() {
            row.nee += 0.0005;
            row.vegetation *= 1.02;
        }
        let obs = ObservationTable::new(rows);
        let mask = ObservationMask::every_nth(Variable::Soil, 7, 30);
        let settings = LikelihoodSettings::default();

        let total = log_likelihood(&sim, &obs, &mask, 0.05, &settings).unwrap();
        let parts: f64 = Variable::ALL
            .iter()
            .map(|v| variable_log_likelihood(&sim, &obs, &mask, *v, 0.05, &settings).unwrap())
            .sum();
        assert_relative_eq!(total, parts, max_relative = 1e-12);
    }

    #[test]
    fn trait_matches_free_function() {
        let sim = outputs(10);
        let target = Target::new(
            ObservationTable::from_outputs(&sim),
            ObservationMask::every_nth(Variable::Root, 2, 10),
        )
        .unwrap();
        let likelihood = HeteroscedasticGaussian::default();

        let via_trait = likelihood.ln_likelihood(&sim, &target, 0.2).unwrap();
        let direct = log_likelihood(
            &sim,
            &target.observations,
            &target.mask,
            0.2,
            likelihood.settings(),
        )
        .unwrap();
        assert_eq!(via_trait, direct);
    }
}
