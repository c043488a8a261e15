//! Log-posterior evaluation for an external sampler.
//!
//! `log_posterior = log_prior + log_likelihood`, with negative infinity for
//! vectors outside the prior support or for which the model cannot be run.

use crate::likelihood::LikelihoodFn;
use crate::model_runner::ModelRunner;
use crate::parameter_set::ParameterSet;
use crate::target::Target;
use crate::{Error, Result};
use rayon::prelude::*;
use tracing::debug;
use vsem_core::FloatValue;

/// Prior, model, likelihood and observations of one calibration problem.
pub struct Posterior<R: ModelRunner, L: LikelihoodFn> {
    params: ParameterSet,
    runner: R,
    likelihood: L,
    target: Target,
}

impl<R: ModelRunner, L: LikelihoodFn> Posterior<R, L> {
    /// Create a posterior.
    ///
    /// The prior and the runner must name the same parameters in the same order.
    pub fn new(params: ParameterSet, runner: R, likelihood: L, target: Target) -> Result<Self> {
        let prior_names = params.names();
        if prior_names.as_slice() != runner.param_names() {
            return Err(Error::InvalidParameter(format!(
                "prior parameters {:?} do not match model parameters {:?}",
                prior_names,
                runner.param_names()
            )));
        }
        Ok(Self {
            params,
            runner,
            likelihood,
            target,
        })
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.names()
    }

    pub fn parameter_set(&self) -> &ParameterSet {
        &self.params
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Log prior density of a parameter vector.
    pub fn log_prior(&self, params: &[FloatValue]) -> Result<FloatValue> {
        self.params.log_prior(params)
    }

    /// Run the model and evaluate the likelihood of the observations.
    pub fn log_likelihood(&self, params: &[FloatValue]) -> Result<FloatValue> {
        let run = self.runner.run(params)?;
        self.likelihood
            .ln_likelihood(&run.outputs, &self.target, run.error_scale)
    }

    /// Unnormalised log posterior density.
    ///
    /// The model is not run for vectors outside the prior support.
    pub fn log_posterior(&self, params: &[FloatValue]) -> FloatValue {
        let log_prior = match self.log_prior(params) {
            Ok(lp) if lp.is_finite() => lp,
            _ => return FloatValue::NEG_INFINITY,
        };

        match self.log_likelihood(params) {
            Ok(ll) => log_prior + ll,
            Err(e) => {
                debug!(error = %e, "Rejecting parameter vector");
                FloatValue::NEG_INFINITY
            }
        }
    }
}

impl<R: ModelRunner + Sync, L: LikelihoodFn + Sync> Posterior<R, L> {
    /// Compute the log posterior for multiple parameter vectors in parallel.
    pub fn log_posterior_batch(&self, param_sets: &[Vec<FloatValue>]) -> Vec<FloatValue> {
        param_sets
            .par_iter()
            .map(|params| self.log_posterior(params))
            .collect()
    }
}
