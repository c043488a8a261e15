//! Observable output variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A column of the output table that can be compared against observations.
///
/// The declaration order matches the column order of [`crate::OutputTable::to_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    /// Net ecosystem exchange
    /// unit: kg C / m^2 / day
    Nee,
    /// Vegetation (aboveground) carbon pool
    /// unit: kg C / m^2
    Vegetation,
    /// Soil organic carbon pool
    /// unit: kg C / m^2
    Soil,
    /// Root carbon pool
    /// unit: kg C / m^2
    Root,
}

impl Variable {
    /// All observable variables in column order.
    pub const ALL: [Variable; 4] = [
        Variable::Nee,
        Variable::Vegetation,
        Variable::Soil,
        Variable::Root,
    ];

    /// Stable name used in configuration files and log fields.
    pub fn name(self) -> &'static str {
        match self {
            Variable::Nee => "nee",
            Variable::Vegetation => "vegetation",
            Variable::Soil => "soil",
            Variable::Root => "root",
        }
    }

    /// Column index in the output array.
    pub fn column(self) -> usize {
        match self {
            Variable::Nee => 0,
            Variable::Vegetation => 1,
            Variable::Soil => 2,
            Variable::Root => 3,
        }
    }

    /// Whether this variable is a flux rather than a pool.
    pub fn is_flux(self) -> bool {
        matches!(self, Variable::Nee)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| format!("unknown variable '{}'", s))
    }
}
