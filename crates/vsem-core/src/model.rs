//! Carbon-pool integrator
//!
//! Advances the three VSEM pools one day at a time with an explicit forward step.
//!
//! For each day, using the pools at the start of the day:
//!
//! $$ \text{GPP} = \text{PAR} \cdot \text{LUE} \cdot (1 - e^{-k \cdot \text{LAR} \cdot C_v}) $$
//! $$ \text{NPP} = (1 - \gamma) \cdot \text{GPP} $$
//! $$ C_v' = C_v + A_v \text{NPP} - C_v / \tau_v $$
//! $$ C_r' = C_r + (1 - A_v) \text{NPP} - C_r / \tau_r $$
//! $$ C_s' = C_s + C_v / \tau_v + C_r / \tau_r - C_s / \tau_s $$
//! $$ \text{NEE} = \gamma \text{GPP} + C_s / \tau_s - \text{GPP} $$

use crate::errors::{VsemError, VsemResult};
use crate::forcing::Forcing;
use crate::outputs::{DailyFluxes, OutputTable};
use crate::parameters::VsemParameters;
use crate::state::Pools;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What to do when a forward step would drain a pool below zero.
///
/// A step overshoots when a turnover time is shorter than one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPolicy {
    /// Limit each pool's daily turnover to the carbon it holds. The limited
    /// flux is what reaches the soil and what the soil respires, so carbon is
    /// conserved and no pool goes negative.
    #[default]
    Clamp,
    /// Keep the raw forward-step value, even if negative.
    Unclamped,
}

/// Execute one day of the model.
///
/// Pure function of the start-of-day pools; turnover is not limited here.
pub fn step(pools: &Pools, params: &VsemParameters, par: FloatValue) -> (Pools, DailyFluxes) {
    let (new_pools, fluxes, _) = advance(pools, params, par, PoolPolicy::Unclamped);
    (new_pools, fluxes)
}

/// Carbon leaving a pool in one day.
///
/// Under [`PoolPolicy::Clamp`] the outflow cannot exceed the pool. The flag is
/// set when that limit was applied.
fn turnover(pool: FloatValue, tau: FloatValue, policy: PoolPolicy) -> (FloatValue, bool) {
    let outflow = pool / tau;
    match policy {
        PoolPolicy::Clamp if outflow > pool && pool >= 0.0 => (pool, true),
        _ => (outflow, false),
    }
}

fn advance(
    pools: &Pools,
    params: &VsemParameters,
    par: FloatValue,
    policy: PoolPolicy,
) -> (Pools, DailyFluxes, bool) {
    let canopy_absorption = 1.0
        - (-params.light_extinction * params.leaf_area_ratio * pools.vegetation).exp();
    let gpp = par * params.light_use_efficiency * canopy_absorption;
    let npp = (1.0 - params.respiration_fraction) * gpp;

    let (vegetation_turnover, vegetation_limited) =
        turnover(pools.vegetation, params.tau_vegetation, policy);
    let (root_turnover, root_limited) = turnover(pools.root, params.tau_root, policy);
    let (soil_turnover, soil_limited) = turnover(pools.soil, params.tau_soil, policy);

    let new_pools = Pools {
        vegetation: pools.vegetation + params.aboveground_allocation * npp - vegetation_turnover,
        root: pools.root + (1.0 - params.aboveground_allocation) * npp - root_turnover,
        soil: pools.soil + vegetation_turnover + root_turnover - soil_turnover,
    };

    // Autotrophic plus heterotrophic respiration, less uptake
    let nee = params.respiration_fraction * gpp + soil_turnover - gpp;

    (
        new_pools,
        DailyFluxes { gpp, npp, nee },
        vegetation_limited || root_limited || soil_limited,
    )
}

/// The VSEM forward model: a parameter set and a negative-pool policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vsem {
    parameters: VsemParameters,
    #[serde(default)]
    policy: PoolPolicy,
}

impl Vsem {
    /// Create a model after validating the parameters.
    pub fn from_parameters(parameters: VsemParameters) -> VsemResult<Self> {
        parameters.validate()?;
        Ok(Self {
            parameters,
            policy: PoolPolicy::default(),
        })
    }

    /// Set the negative-pool policy.
    pub fn with_policy(self, policy: PoolPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn parameters(&self) -> &VsemParameters {
        &self.parameters
    }

    pub fn policy(&self) -> PoolPolicy {
        self.policy
    }

    /// Run the model over a forcing series, starting from the initial pools
    /// held in the parameters.
    pub fn run(&self, forcing: &Forcing) -> VsemResult<OutputTable> {
        self.run_from(self.parameters.initial_pools(), forcing)
    }

    /// Run the model from explicit starting pools.
    ///
    /// Fails with [`VsemError::NonFiniteState`] on the first day a pool or flux
    /// overflows or becomes NaN.
    pub fn run_from(&self, initial: Pools, forcing: &Forcing) -> VsemResult<OutputTable> {
        debug!(
            days = forcing.len(),
            policy = ?self.policy,
            "Running VSEM"
        );

        let mut outputs = OutputTable::with_capacity(forcing.len());
        let mut pools = initial;
        let mut limited_days = 0usize;

        for (day, par) in forcing.iter().enumerate() {
            let (new_pools, fluxes, limited) = advance(&pools, &self.parameters, par, self.policy);
            if !(new_pools.is_finite() && fluxes.is_finite()) {
                warn!(day, ?new_pools, ?fluxes, "Non-finite model state");
                return Err(VsemError::NonFiniteState { day });
            }
            if limited {
                limited_days += 1;
            }
            outputs.push(&fluxes, &new_pools);
            pools = new_pools;
        }

        if limited_days > 0 {
            warn!(
                limited_days,
                days = forcing.len(),
                "Turnover limited to pool contents to keep pools non-negative"
            );
        }

        Ok(outputs)
    }
}

/// Simulate VSEM over a forcing series.
///
/// Returns one output row per forcing day. Fails with
/// [`VsemError::InvalidParameter`] if any parameter is out of its domain.
/// Turnover is limited so pools stay non-negative (see [`PoolPolicy`]), and a
/// run that overflows fails with [`VsemError::NonFiniteState`].
pub fn simulate(parameters: &VsemParameters, forcing: &Forcing) -> VsemResult<OutputTable> {
    let model = Vsem::from_parameters(*parameters)?;
    model.run(forcing)
}

/// Simulate from explicit initial pools instead of those in the parameters.
pub fn simulate_from(
    parameters: &VsemParameters,
    initial: Pools,
    forcing: &Forcing,
) -> VsemResult<OutputTable> {
    let model = Vsem::from_parameters(*parameters)?;
    if initial.any_negative() {
        return Err(VsemError::InvalidParameter {
            name: "initial_pools".to_string(),
            value: initial
                .vegetation
                .min(initial.root)
                .min(initial.soil),
            reason: "pools must be non-negative".to_string(),
        });
    }
    model.run_from(initial, forcing)
}
