//! Observations to calibrate against.
//!
//! Observations share the row shape of the model output. Which rows are actually
//! observed is recorded separately in an [`ObservationMask`] as an explicit set of
//! day indices per variable, so unobserved rows never carry a sentinel value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vsem_core::{FloatValue, OutputRow, OutputTable, Variable};

/// Observed rows, aligned with model output by day index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationTable {
    rows: Vec<OutputRow>,
}

impl ObservationTable {
    pub fn new(rows: Vec<OutputRow>) -> Self {
        Self { rows }
    }

    /// Use a model output as observations (for twin experiments).
    pub fn from_outputs(outputs: &OutputTable) -> Self {
        Self::new(outputs.rows().to_vec())
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

    pub fn get(&self, day: usize, variable: Variable) -> Option<FloatValue> {
        self.rows.get(day).map(|r| r.get(variable))
    }
}

/// Per-variable set of observed day indices.
///
/// A variable without an entry is observed on every day. An entry with an
/// empty set means the variable is never observed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObservationMask {
    observed: BTreeMap<Variable, BTreeSet<usize>>,
}

impl ObservationMask {
    /// Every variable observed on every day.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only every `n`th day of `variable` is observed, starting from day 0.
    pub fn every_nth(variable: Variable, n: usize, len: usize) -> Self {
        Self::all().with_every_nth(variable, n, len)
    }

    /// Restrict `variable` to the given days.
    pub fn with_days(mut self, variable: Variable, days: impl IntoIterator<Item = usize>) -> Self {
        self.observed.insert(variable, days.into_iter().collect());
        self
    }

    /// Restrict `variable` to every `n`th day of a series of length `len`.
    ///
    /// `n` of zero is treated as one.
    pub fn with_every_nth(self, variable: Variable, n: usize, len: usize) -> Self {
        self.with_days(variable, (0..len).step_by(n.max(1)))
    }

    /// Mark `variable` as never observed.
    pub fn without(self, variable: Variable) -> Self {
        self.with_days(variable, std::iter::empty())
    }

    /// Whether `variable` has an explicit subsample.
    pub fn is_subsampled(&self, variable: Variable) -> bool {
        self.observed.contains_key(&variable)
    }

    /// Observed day indices of `variable` in a series of length `len`, ascending.
    pub fn observed_days(&self, variable: Variable, len: usize) -> Vec<usize> {
        match self.observed.get(&variable) {
            Some(days) => days.iter().copied().collect(),
            None => (0..len).collect(),
        }
    }

    /// Check every explicit index lies inside a series of length `len`.
    pub fn validate(&self, len: usize) -> Result<()> {
        for (variable, days) in &self.observed {
            if let Some(&last) = days.iter().next_back() {
                if last >= len {
                    return Err(Error::ShapeMismatch {
                        what: format!("observation mask of {}", variable),
                        expected: len,
                        found: last + 1,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Observations together with the mask saying which of them are real.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    pub observations: ObservationTable,
    #[serde(default)]
    pub mask: ObservationMask,
}

impl Target {
    pub fn new(observations: ObservationTable, mask: ObservationMask) -> Result<Self> {
        mask.validate(observations.len())?;
        Ok(Self { observations, mask })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Total number of observed values across all variables.
    pub fn n_observed(&self, variables: &[Variable]) -> usize {
        variables
            .iter()
            .map(|v| self.mask.observed_days(*v, self.len()).len())
            .sum()
    }
}
