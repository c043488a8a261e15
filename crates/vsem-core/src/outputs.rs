//! Daily fluxes and the output table.

use crate::state::Pools;
use crate::variable::Variable;
use crate::FloatValue;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Carbon fluxes diagnosed for one simulated day.
///
/// unit: kg C / m^2 / day
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyFluxes {
    /// Gross primary production
    pub gpp: FloatValue,
    /// Net primary production, GPP less autotrophic respiration
    pub npp: FloatValue,
    /// Net ecosystem exchange, total respiration less GPP (positive = source)
    pub nee: FloatValue,
}

impl DailyFluxes {
    pub fn is_finite(&self) -> bool {
        self.gpp.is_finite() && self.npp.is_finite() && self.nee.is_finite()
    }
}

/// One day of model output: NEE and the pools at the end of the day.
///
/// Observations use the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputRow {
    pub nee: FloatValue,
    pub vegetation: FloatValue,
    pub soil: FloatValue,
    pub root: FloatValue,
}

impl OutputRow {
    pub fn new(fluxes: &DailyFluxes, pools: &Pools) -> Self {
        Self {
            nee: fluxes.nee,
            vegetation: pools.vegetation,
            soil: pools.soil,
            root: pools.root,
        }
    }

    pub fn get(&self, variable: Variable) -> FloatValue {
        match variable {
            Variable::Nee => self.nee,
            Variable::Vegetation => self.vegetation,
            Variable::Soil => self.soil,
            Variable::Root => self.root,
        }
    }

    pub fn set(&mut self, variable: Variable, value: FloatValue) {
        match variable {
            Variable::Nee => self.nee = value,
            Variable::Vegetation => self.vegetation = value,
            Variable::Soil => self.soil = value,
            Variable::Root => self.root = value,
        }
    }
}

/// Append-only table with one row per simulated day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputTable {
    rows: Vec<OutputRow>,
    gpp: Vec<FloatValue>,
    npp: Vec<FloatValue>,
}

impl OutputTable {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
            gpp: Vec::with_capacity(n),
            npp: Vec::with_capacity(n),
        }
    }

    /// Record a day from its fluxes and end-of-day pools.
    pub fn push(&mut self, fluxes: &DailyFluxes, pools: &Pools) {
        self.rows.push(OutputRow::new(fluxes, pools));
        self.gpp.push(fluxes.gpp);
        self.npp.push(fluxes.npp);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn row(&self, day: usize) -> Option<&OutputRow> {
        self.rows.get(day)
    }

    /// Daily gross primary production.
    pub fn gpp(&self) -> &[FloatValue] {
        &self.gpp
    }

    /// Daily net primary production.
    pub fn npp(&self) -> &[FloatValue] {
        &self.npp
    }

    /// Values of one variable across all days.
    pub fn column(&self, variable: Variable) -> Vec<FloatValue> {
        self.rows.iter().map(|r| r.get(variable)).collect()
    }

    /// Output as a `(days, 4)` array with columns ordered as [`Variable::ALL`].
    pub fn to_array(&self) -> Array2<FloatValue> {
        let mut array = Array2::zeros((self.len(), Variable::ALL.len()));
        for (day, row) in self.rows.iter().enumerate() {
            for variable in Variable::ALL {
                array[[day, variable.column()]] = row.get(variable);
            }
        }
        array
    }
}
