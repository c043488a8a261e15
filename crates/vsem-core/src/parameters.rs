//! VSEM Parameters
//!
//! Eight process parameters and three initial pool sizes. A parameter set is
//! immutable for the duration of a run and is always passed explicitly to the
//! integrator.

use crate::errors::{VsemError, VsemResult};
use crate::state::Pools;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Parameters of the Very Simple Ecosystem Model.
///
/// # Carbon Flows
///
/// ```text
///              GPP                 NPP (Av)
///  PAR -----> [CANOPY] ---------> [VEGETATION] --tau_v--+
///                |     \                                 |
///                |      \ NPP (1 - Av)                   v
///   GAMMA * GPP  |       +-------> [ROOT] ----tau_r---> [SOIL] --tau_s--> atmosphere
///                v
///           atmosphere
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VsemParameters {
    /// Light extinction coefficient of the canopy (KEXT)
    /// unit: dimensionless
    /// default: 0.5
    pub light_extinction: FloatValue,

    /// Leaf area ratio: leaf area per unit vegetation carbon (LAR)
    /// unit: m^2 / kg C
    /// default: 1.5
    pub leaf_area_ratio: FloatValue,

    /// Light use efficiency (LUE)
    /// unit: kg C / MJ
    /// default: 0.002
    pub light_use_efficiency: FloatValue,

    /// Fraction of GPP lost to autotrophic respiration (GAMMA)
    /// unit: dimensionless
    /// default: 0.4
    pub respiration_fraction: FloatValue,

    /// Turnover time of the vegetation pool (tauV)
    /// unit: day
    /// default: 1440
    pub tau_vegetation: FloatValue,

    /// Turnover time of the soil pool (tauS)
    /// unit: day
    /// default: 27370
    pub tau_soil: FloatValue,

    /// Turnover time of the root pool (tauR)
    /// unit: day
    /// default: 1440
    pub tau_root: FloatValue,

    /// Fraction of NPP allocated aboveground to vegetation (Av)
    /// unit: dimensionless
    /// default: 0.5
    pub aboveground_allocation: FloatValue,

    /// Initial vegetation carbon (Cv)
    /// unit: kg C / m^2
    /// default: 3.0
    pub initial_vegetation: FloatValue,

    /// Initial soil carbon (Cs)
    /// unit: kg C / m^2
    /// default: 15.0
    pub initial_soil: FloatValue,

    /// Initial root carbon (Cr)
    /// unit: kg C / m^2
    /// default: 3.0
    pub initial_root: FloatValue,
}

impl Default for VsemParameters {
    fn default() -> Self {
        Self {
            light_extinction: 0.5,
            leaf_area_ratio: 1.5,
            light_use_efficiency: 0.002,
            respiration_fraction: 0.4,
            tau_vegetation: 1440.0,
            tau_soil: 27370.0,
            tau_root: 1440.0,
            aboveground_allocation: 0.5,
            initial_vegetation: 3.0,
            initial_soil: 15.0,
            initial_root: 3.0,
        }
    }
}

impl VsemParameters {
    /// Number of scalar parameters, including the initial pools.
    pub const N_PARAMS: usize = 11;

    /// Parameter names in vector order.
    pub const NAMES: [&'static str; Self::N_PARAMS] = [
        "light_extinction",
        "leaf_area_ratio",
        "light_use_efficiency",
        "respiration_fraction",
        "tau_vegetation",
        "tau_soil",
        "tau_root",
        "aboveground_allocation",
        "initial_vegetation",
        "initial_soil",
        "initial_root",
    ];

    /// Build parameters from a slice ordered as [`VsemParameters::NAMES`].
    pub fn from_slice(values: &[FloatValue]) -> VsemResult<Self> {
        if values.len() != Self::N_PARAMS {
            return Err(VsemError::ShapeMismatch {
                what: "parameter vector".to_string(),
                expected: Self::N_PARAMS,
                found: values.len(),
            });
        }
        Ok(Self {
            light_extinction: values[0],
            leaf_area_ratio: values[1],
            light_use_efficiency: values[2],
            respiration_fraction: values[3],
            tau_vegetation: values[4],
            tau_soil: values[5],
            tau_root: values[6],
            aboveground_allocation: values[7],
            initial_vegetation: values[8],
            initial_soil: values[9],
            initial_root: values[10],
        })
    }

    /// Parameters as a vector ordered as [`VsemParameters::NAMES`].
    pub fn to_vec(&self) -> Vec<FloatValue> {
        vec![
            self.light_extinction,
            self.leaf_area_ratio,
            self.light_use_efficiency,
            self.respiration_fraction,
            self.tau_vegetation,
            self.tau_soil,
            self.tau_root,
            self.aboveground_allocation,
            self.initial_vegetation,
            self.initial_soil,
            self.initial_root,
        ]
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<FloatValue> {
        let index = Self::NAMES.iter().position(|n| *n == name)?;
        Some(self.to_vec()[index])
    }

    /// Set a parameter by name.
    pub fn set(&mut self, name: &str, value: FloatValue) -> VsemResult<()> {
        let index = Self::NAMES
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| VsemError::invalid_parameter(name, value, "unknown parameter"))?;
        let mut values = self.to_vec();
        values[index] = value;
        *self = Self::from_slice(&values)?;
        Ok(())
    }

    /// Pools at the start of a run.
    pub fn initial_pools(&self) -> Pools {
        Pools::new(
            self.initial_vegetation,
            self.initial_root,
            self.initial_soil,
        )
    }

    /// Check that every parameter lies in its physical domain.
    ///
    /// Turnover times must be strictly positive, fractions must lie in `[0, 1]`
    /// and everything else must be non-negative. Non-finite values are rejected.
    pub fn validate(&self) -> VsemResult<()> {
        for (name, value) in Self::NAMES.iter().zip(self.to_vec()) {
            if !value.is_finite() {
                return Err(VsemError::invalid_parameter(name, value, "must be finite"));
            }
        }

        let turnover = [
            ("tau_vegetation", self.tau_vegetation),
            ("tau_soil", self.tau_soil),
            ("tau_root", self.tau_root),
        ];
        for (name, value) in turnover {
            if value <= 0.0 {
                return Err(VsemError::invalid_parameter(
                    name,
                    value,
                    "turnover time must be positive",
                ));
            }
        }

        let fractions = [
            ("respiration_fraction", self.respiration_fraction),
            ("aboveground_allocation", self.aboveground_allocation),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(VsemError::invalid_parameter(
                    name,
                    value,
                    "fraction must lie in [0, 1]",
                ));
            }
        }

        let non_negative = [
            ("light_extinction", self.light_extinction),
            ("leaf_area_ratio", self.leaf_area_ratio),
            ("light_use_efficiency", self.light_use_efficiency),
            ("initial_vegetation", self.initial_vegetation),
            ("initial_soil", self.initial_soil),
            ("initial_root", self.initial_root),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(VsemError::invalid_parameter(
                    name,
                    value,
                    "must be non-negative",
                ));
            }
        }

        Ok(())
    }
}
