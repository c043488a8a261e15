//! Synthetic observations for twin experiments.

use crate::likelihood::LikelihoodSettings;
use crate::target::ObservationTable;
use crate::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use vsem_core::{FloatValue, OutputTable, Variable};

/// Perturb simulated output with the likelihood's own error model.
///
/// Every value of every variable receives independent Gaussian noise with the
/// standard deviation the likelihood would assign to that prediction.
pub fn observe<R: Rng + ?Sized>(
    outputs: &OutputTable,
    error_scale: FloatValue,
    settings: &LikelihoodSettings,
    rng: &mut R,
) -> Result<ObservationTable> {
    settings.validate()?;
    if !(error_scale.is_finite() && error_scale > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "error_scale must be positive and finite, got {}",
            error_scale
        )));
    }

    let mut rows = outputs.rows().to_vec();
    for row in rows.iter_mut() {
        for variable in Variable::ALL {
            let predicted = row.get(variable);
            let sd = settings.standard_deviation(variable, predicted, error_scale);
            let noise = Normal::new(0.0, sd).map_err(|e| {
                Error::InvalidParameter(format!("invalid noise sd {}: {}", sd, e))
            })?;
            row.set(variable, predicted + noise.sample(rng));
        }
    }

    Ok(ObservationTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use vsem_core::{simulate, SeasonalPar, VsemParameters};

    fn outputs() -> OutputTable {
        let forcing = SeasonalPar::default().generate(365).unwrap();
        simulate(&VsemParameters::default(), &forcing).unwrap()
    }

    #[test]
    fn observations_are_reproducible() {
        let sim = outputs();
        let settings = LikelihoodSettings::default();
        let a = observe(&sim, 0.1, &settings, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = observe(&sim, 0.1, &settings, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), sim.len());
    }

    #[test]
    fn noise_scales_with_error_scale() {
        let sim = outputs();
        let settings = LikelihoodSettings::default();

        let spread = |scale: f64| -> f64 {
            let obs = observe(&sim, scale, &settings, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
            obs.rows()
                .iter()
                .zip(sim.rows())
                .map(|(o, s)| ((o.soil - s.soil) / s.soil).powi(2))
                .sum::<f64>()
                / sim.len() as f64
        };

        let narrow = spread(0.01).sqrt();
        let wide = spread(0.2).sqrt();
        assert!((narrow - 0.01).abs() < 0.003, "narrow spread {}", narrow);
        assert!((wide - 0.2).abs() < 0.05, "wide spread {}", wide);
    }

    #[test]
    fn rejects_invalid_scale() {
        let sim = outputs();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(observe(&sim, 0.0, &LikelihoodSettings::default(), &mut rng).is_err());
    }
}
