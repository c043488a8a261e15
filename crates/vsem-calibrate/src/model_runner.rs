//! Mapping calibrated parameter vectors onto model runs.

use crate::parameter_set::{CalibrationParameters, ReferenceParameters};
use crate::{Error, Result};
use rayon::prelude::*;
use vsem_core::{FloatValue, Forcing, OutputTable, PoolPolicy, Vsem};

/// The output of a single run, with the error scale used to judge it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRun {
    pub outputs: OutputTable,
    pub error_scale: FloatValue,
}

/// Runs the model for a vector of calibrated parameter values.
pub trait ModelRunner {
    /// Names of the calibrated parameters, in vector order.
    fn param_names(&self) -> &[String];

    /// Run the model for one parameter vector.
    fn run(&self, params: &[FloatValue]) -> Result<ModelRun>;

    /// Run independent parameter vectors in parallel.
    ///
    /// Each run owns its own state; results are returned in input order.
    fn run_batch(&self, param_sets: &[Vec<FloatValue>]) -> Vec<Result<ModelRun>>
    where
        Self: Sync,
    {
        param_sets.par_iter().map(|p| self.run(p)).collect()
    }
}

/// [`ModelRunner`] for VSEM: overlays the selected values onto a reference
/// table and simulates over a fixed forcing series.
#[derive(Debug, Clone)]
pub struct VsemRunner {
    forcing: Forcing,
    reference: ReferenceParameters,
    selection: Vec<String>,
    policy: PoolPolicy,
}

impl VsemRunner {
    pub fn new(
        forcing: Forcing,
        reference: ReferenceParameters,
        selection: Vec<String>,
    ) -> Result<Self> {
        reference.validate()?;
        for name in &selection {
            if reference.get(name).is_none() {
                return Err(Error::InvalidParameter(format!(
                    "unknown reference parameter '{}'",
                    name
                )));
            }
        }
        Ok(Self {
            forcing,
            reference,
            selection,
            policy: PoolPolicy::default(),
        })
    }

    pub fn with_policy(self, policy: PoolPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn forcing(&self) -> &Forcing {
        &self.forcing
    }

    pub fn reference(&self) -> &ReferenceParameters {
        &self.reference
    }

    /// Full parameters for a vector of selected values.
    pub fn compose(&self, params: &[FloatValue]) -> Result<CalibrationParameters> {
        self.reference.compose(&self.selection, params)
    }
}

impl ModelRunner for VsemRunner {
    fn param_names(&self) -> &[String] {
        &self.selection
    }

    fn run(&self, params: &[FloatValue]) -> Result<ModelRun> {
        let composed = self.compose(params)?;
        let model = Vsem::from_parameters(composed.model)?.with_policy(self.policy);
        Ok(ModelRun {
            outputs: model.run(&self.forcing)?,
            error_scale: composed.error_scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_set::ERROR_SCALE;
    use vsem_core::{simulate, SeasonalPar, VsemError, VsemParameters};

    fn runner(selection: &[&str]) -> VsemRunner {
        let forcing = SeasonalPar::default().generate(120).unwrap();
        VsemRunner::new(
            forcing,
            ReferenceParameters::default(),
            selection.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn best_values_reproduce_default_simulation() {
        let runner = runner(&["light_use_efficiency", ERROR_SCALE]);
        let run = runner.run(&[0.002, 0.1]).unwrap();
        let expected = simulate(&VsemParameters::default(), runner.forcing()).unwrap();

        assert_eq!(run.outputs, expected);
        assert_eq!(run.error_scale, 0.1);
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let forcing = Forcing::zeros(3).unwrap();
        let result = VsemRunner::new(
            forcing,
            ReferenceParameters::default(),
            vec!["tau_humus".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn invalid_model_parameters_surface_as_errors() {
        let runner = runner(&["tau_soil"]);
        match runner.run(&[-5.0]) {
            Err(Error::Model(VsemError::InvalidParameter { name, .. })) => {
                assert_eq!(name, "tau_soil")
            }
            other => panic!("expected invalid tau_soil, got {:?}", other),
        }
    }

    #[test]
    fn diverging_run_surfaces_as_error() {
        let runner = VsemRunner::new(
            Forcing::zeros(730).unwrap(),
            ReferenceParameters::default(),
            vec!["tau_vegetation".to_string()],
        )
        .unwrap()
        .with_policy(PoolPolicy::Unclamped);

        assert!(matches!(
            runner.run(&[0.1]),
            Err(Error::Model(VsemError::NonFiniteState { .. }))
        ));
        assert!(runner.run(&[1440.0]).is_ok());
    }

    #[test]
    fn wrong_vector_length_is_rejected() {
        let runner = runner(&["tau_soil", "tau_root"]);
        assert!(matches!(
            runner.run(&[1.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn batch_matches_serial_runs() {
        let runner = runner(&["light_extinction", "tau_vegetation"]);
        let param_sets = vec![
            vec![0.3, 1000.0],
            vec![0.5, 1440.0],
            vec![0.9, 2500.0],
            vec![0.5, -1.0],
        ];

        let batch = runner.run_batch(&param_sets);
        assert_eq!(batch.len(), 4);
        for (params, result) in param_sets.iter().zip(&batch) {
            match (runner.run(params), result) {
                (Ok(serial), Ok(parallel)) => assert_eq!(&serial, parallel),
                (Err(_), Err(_)) => {}
                (serial, parallel) => panic!(
                    "serial and batch disagree: {:?} vs {:?}",
                    serial.is_ok(),
                    parallel.is_ok()
                ),
            }
        }
        assert!(batch[3].is_err());
    }
}
