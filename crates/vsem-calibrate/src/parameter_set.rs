//! Reference parameter values, bounds and priors.
//!
//! [`ReferenceParameters`] is the table of every calibratable quantity (the 11
//! model parameters and the likelihood's error scale) with a best guess and
//! lower/upper bounds. A calibration selects a subset of it; the selected
//! entries get uniform priors over their bounds in a [`ParameterSet`] and the
//! unselected ones stay at their best value.

use crate::{Error, Result};
use indexmap::IndexMap;
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use vsem_core::{FloatValue, VsemParameters};

/// Name of the likelihood error scale in the reference table.
pub const ERROR_SCALE: &str = "error_scale";

/// Uniform prior over `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uniform {
    lower: FloatValue,
    upper: FloatValue,
}

impl Uniform {
    pub fn new(lower: FloatValue, upper: FloatValue) -> Result<Self> {
        if !(lower.is_finite() && upper.is_finite()) || lower >= upper {
            return Err(Error::InvalidParameter(format!(
                "uniform bounds must be finite with lower < upper, got [{}, {}]",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> FloatValue {
        self.lower
    }

    pub fn upper(&self) -> FloatValue {
        self.upper
    }

    pub fn contains(&self, x: FloatValue) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Log probability density at `x`; negative infinity outside the support.
    pub fn ln_pdf(&self, x: FloatValue) -> FloatValue {
        if self.contains(x) {
            -(self.upper - self.lower).ln()
        } else {
            FloatValue::NEG_INFINITY
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FloatValue {
        rng.gen_range(self.lower..=self.upper)
    }
}

/// Ordered set of calibrated parameters and their priors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    params: IndexMap<String, Uniform>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Re-adding a name replaces its prior but keeps its position.
    pub fn add(&mut self, name: impl Into<String>, prior: Uniform) -> &mut Self {
        self.params.insert(name.into(), prior);
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    pub fn prior(&self, name: &str) -> Option<&Uniform> {
        self.params.get(name)
    }

    /// Sum of the log prior densities of a parameter vector.
    ///
    /// Returns negative infinity when any value lies outside its bounds.
    pub fn log_prior(&self, values: &[FloatValue]) -> Result<FloatValue> {
        if values.len() != self.len() {
            return Err(Error::ShapeMismatch {
                what: "parameter vector".to_string(),
                expected: self.len(),
                found: values.len(),
            });
        }
        Ok(self
            .params
            .values()
            .zip(values)
            .map(|(prior, &x)| prior.ln_pdf(x))
            .sum())
    }

    /// Draw `n` vectors from the priors as an `(n, n_params)` array.
    pub fn sample_random_with_rng<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Array2<f64> {
        let mut samples = Array2::zeros((n, self.len()));
        for i in 0..n {
            for (j, prior) in self.params.values().enumerate() {
                samples[[i, j]] = prior.sample(rng);
            }
        }
        samples
    }
}

/// Best guess and bounds for one calibratable quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub best: FloatValue,
    pub lower: FloatValue,
    pub upper: FloatValue,
}

impl ParameterBounds {
    pub const fn new(best: FloatValue, lower: FloatValue, upper: FloatValue) -> Self {
        Self { best, lower, upper }
    }

    pub fn prior(&self) -> Result<Uniform> {
        Uniform::new(self.lower, self.upper)
    }
}

/// Model parameters plus the likelihood error scale for a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    pub model: VsemParameters,
    pub error_scale: FloatValue,
}

/// Reference table of all calibratable quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceParameters {
    entries: IndexMap<String, ParameterBounds>,
}

impl Default for ReferenceParameters {
    fn default() -> Self {
        let entries = [
            ("light_extinction", ParameterBounds::new(0.5, 0.2, 1.0)),
            ("leaf_area_ratio", ParameterBounds::new(1.5, 0.2, 3.0)),
            ("light_use_efficiency", ParameterBounds::new(0.002, 0.0008, 0.004)),
            ("respiration_fraction", ParameterBounds::new(0.4, 0.2, 0.6)),
            ("tau_vegetation", ParameterBounds::new(1440.0, 720.0, 2880.0)),
            ("tau_soil", ParameterBounds::new(27370.0, 13685.0, 54740.0)),
            ("tau_root", ParameterBounds::new(1440.0, 720.0, 2880.0)),
            ("aboveground_allocation", ParameterBounds::new(0.5, 0.3, 1.0)),
            ("initial_vegetation", ParameterBounds::new(3.0, 1.5, 4.0)),
            ("initial_soil", ParameterBounds::new(15.0, 7.5, 24.0)),
            ("initial_root", ParameterBounds::new(3.0, 1.5, 4.0)),
            (ERROR_SCALE, ParameterBounds::new(0.1, 0.001, 0.5)),
        ]
        .into_iter()
        .map(|(name, bounds)| (name.to_string(), bounds))
        .collect();

        Self { entries }
    }
}

impl ReferenceParameters {
    /// Names of every entry, model parameters first and the error scale last.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterBounds> {
        self.entries.get(name)
    }

    /// Replace the bounds of an existing entry.
    pub fn set(&mut self, name: &str, bounds: ParameterBounds) -> Result<()> {
        match self.entries.get_mut(name) {
            Some(entry) => {
                *entry = bounds;
                Ok(())
            }
            None => Err(Error::InvalidParameter(format!(
                "unknown reference parameter '{}'",
                name
            ))),
        }
    }

    /// Check every entry has ordered bounds enclosing its best value and that
    /// the table covers the model parameters and the error scale.
    pub fn validate(&self) -> Result<()> {
        for name in VsemParameters::NAMES.iter().chain(std::iter::once(&ERROR_SCALE)) {
            if !self.entries.contains_key(*name) {
                return Err(Error::InvalidParameter(format!(
                    "reference table is missing '{}'",
                    name
                )));
            }
        }
        for (name, bounds) in &self.entries {
            if !(bounds.lower <= bounds.best && bounds.best <= bounds.upper) {
                return Err(Error::InvalidParameter(format!(
                    "best value of '{}' ({}) lies outside [{}, {}]",
                    name, bounds.best, bounds.lower, bounds.upper
                )));
            }
        }
        Ok(())
    }

    /// Best values of every entry as a full evaluation.
    pub fn best(&self) -> Result<CalibrationParameters> {
        self.compose(&[], &[])
    }

    /// Overlay `values` for the `selection` onto the best values.
    pub fn compose(
        &self,
        selection: &[String],
        values: &[FloatValue],
    ) -> Result<CalibrationParameters> {
        if selection.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "selected parameter values".to_string(),
                expected: selection.len(),
                found: values.len(),
            });
        }

        let mut model = VsemParameters::default();
        for name in VsemParameters::NAMES {
            let bounds = self.get(name).ok_or_else(|| {
                Error::InvalidParameter(format!("reference table is missing '{}'", name))
            })?;
            model.set(name, bounds.best)?;
        }
        let mut error_scale = self
            .get(ERROR_SCALE)
            .ok_or_else(|| {
                Error::InvalidParameter(format!("reference table is missing '{}'", ERROR_SCALE))
            })?
            .best;

        for (name, &value) in selection.iter().zip(values) {
            if name == ERROR_SCALE {
                error_scale = value;
            } else {
                model.set(name, value)?;
            }
        }

        Ok(CalibrationParameters { model, error_scale })
    }

    /// Uniform priors over the bounds of the selected entries, in selection order.
    pub fn parameter_set(&self, selection: &[String]) -> Result<ParameterSet> {
        let mut set = ParameterSet::new();
        for name in selection {
            let bounds = self.get(name).ok_or_else(|| {
                Error::InvalidParameter(format!("unknown reference parameter '{}'", name))
            })?;
            if set.prior(name).is_some() {
                return Err(Error::InvalidParameter(format!(
                    "parameter '{}' selected twice",
                    name
                )));
            }
            set.add(name.clone(), bounds.prior()?);
        }
        Ok(set)
    }

    /// Best values of the selected entries, in selection order.
    pub fn best_values(&self, selection: &[String]) -> Result<Vec<FloatValue>> {
        selection
            .iter()
            .map(|name| {
                self.get(name).map(|b| b.best).ok_or_else(|| {
                    Error::InvalidParameter(format!("unknown reference parameter '{}'", name))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn selection(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn uniform_rejects_bad_bounds() {
        assert!(Uniform::new(1.0, 1.0).is_err());
        assert!(Uniform::new(2.0, 1.0).is_err());
        assert!(Uniform::new(f64::NEG_INFINITY, 1.0).is_err());
    }

    #[test]
    fn uniform_density() {
        let prior = Uniform::new(0.0, 4.0).unwrap();
        assert_eq!(prior.ln_pdf(1.0), -(4.0_f64).ln());
        assert_eq!(prior.ln_pdf(4.0), -(4.0_f64).ln());
        assert_eq!(prior.ln_pdf(4.1), f64::NEG_INFINITY);
    }

    #[test]
    fn log_prior_sums_and_checks_length() {
        let mut set = ParameterSet::new();
        set.add("a", Uniform::new(0.0, 2.0).unwrap())
            .add("b", Uniform::new(0.0, 5.0).unwrap());

        let lp = set.log_prior(&[1.0, 1.0]).unwrap();
        assert!((lp - (-(2.0_f64).ln() - (5.0_f64).ln())).abs() < 1e-12);
        assert_eq!(set.log_prior(&[3.0, 1.0]).unwrap(), f64::NEG_INFINITY);
        assert!(set.log_prior(&[1.0]).is_err());
    }

    #[test]
    fn samples_stay_within_bounds() {
        let reference = ReferenceParameters::default();
        let set = reference.parameter_set(&reference.names()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let samples = set.sample_random_with_rng(50, &mut rng);

        assert_eq!(samples.dim(), (50, 12));
        for row in samples.outer_iter() {
            let lp = set.log_prior(row.as_slice().unwrap()).unwrap();
            assert!(lp.is_finite());
        }
    }

    #[test]
    fn default_reference_is_valid_and_matches_model_defaults() {
        let reference = ReferenceParameters::default();
        reference.validate().unwrap();

        let best = reference.best().unwrap();
        assert_eq!(best.model, VsemParameters::default());
        assert_eq!(best.error_scale, 0.1);
        assert_eq!(reference.names().last().map(String::as_str), Some(ERROR_SCALE));
    }

    #[test]
    fn compose_overlays_selection() {
        let reference = ReferenceParameters::default();
        let sel = selection(&["tau_soil", ERROR_SCALE]);
        let composed = reference.compose(&sel, &[20000.0, 0.3]).unwrap();

        assert_eq!(composed.model.tau_soil, 20000.0);
        assert_eq!(composed.model.tau_root, 1440.0);
        assert_eq!(composed.error_scale, 0.3);
    }

    #[test]
    fn compose_rejects_unknown_and_misaligned() {
        let reference = ReferenceParameters::default();
        assert!(reference
            .compose(&selection(&["tau_humus"]), &[1.0])
            .is_err());
        assert!(reference
            .compose(&selection(&["tau_soil"]), &[1.0, 2.0])
            .is_err());
    }

    #[test]
    fn parameter_set_follows_selection_order() {
        let reference = ReferenceParameters::default();
        let sel = selection(&[ERROR_SCALE, "light_extinction"]);
        let set = reference.parameter_set(&sel).unwrap();

        assert_eq!(set.names(), sel);
        assert_eq!(set.prior(ERROR_SCALE).unwrap().upper(), 0.5);
        assert_eq!(
            reference.best_values(&sel).unwrap(),
            vec![0.1, 0.5]
        );
    }

    #[test]
    fn parameter_set_rejects_duplicates() {
        let reference = ReferenceParameters::default();
        assert!(reference
            .parameter_set(&selection(&["tau_soil", "tau_soil"]))
            .is_err());
    }

    #[test]
    fn validate_catches_best_outside_bounds() {
        let mut reference = ReferenceParameters::default();
        reference
            .set("tau_root", ParameterBounds::new(5000.0, 720.0, 2880.0))
            .unwrap();
        assert!(reference.validate().is_err());
        assert!(reference
            .set("tau_humus", ParameterBounds::new(1.0, 0.0, 2.0))
            .is_err());
    }

    #[test]
    fn reference_serialises_as_table() {
        let reference = ReferenceParameters::default();
        let serialised = toml::to_string(&reference).unwrap();
        assert!(serialised.contains("[tau_soil]"));
        let parsed: ReferenceParameters = toml::from_str(&serialised).unwrap();
        assert_eq!(parsed, reference);
    }
}
