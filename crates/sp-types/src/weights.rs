use serde::{Deserialize, Serialize};

/// Tolerance for the "weights sum to 1" precondition.  Floating-point mixing
/// weights rarely sum exactly to 1, so the check is numeric, not exact.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Mixing weights for one merge candidate.
///
/// Holds the explicit coefficients for the delta checkpoints; the base-model
/// coefficient is derived as `1 - sum(deltas)` and is not range-validated.  The
/// search only bounds the explicit coordinates to [0, 1], so the derived
/// coefficient can leave that range (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    deltas: Vec<f64>,
}

impl WeightVector {
    pub fn new(deltas: Vec<f64>) -> Self {
        Self { deltas }
    }

    /// All-ones seed point: every delta fully weighted.
    pub fn ones(len: usize) -> Self {
        Self {
            deltas: vec![1.0; len],
        }
    }

    pub fn deltas(&self) -> &[f64] {
        &self.deltas
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// The derived base-model coefficient, `1 - sum(deltas)`.
    pub fn base_coefficient(&self) -> f64 {
        1.0 - self.deltas.iter().sum::<f64>()
    }

    /// Full weight list with the base coefficient prepended.  Sums to 1 by
    /// construction, which is what the merger's precondition checks.
    pub fn full_weights(&self) -> Vec<f64> {
        let base = self.base_coefficient();
        if !(0.0..=1.0).contains(&base) {
            tracing::warn!(
                base,
                "base coefficient outside [0, 1]; merged model is not a convex combination"
            );
        }
        let mut weights = Vec::with_capacity(self.deltas.len() + 1);
        weights.push(base);
        weights.extend_from_slice(&self.deltas);
        weights
    }

    /// Path-safe cache key encoding the explicit coefficients directly,
    /// e.g. `1_0.5_0.25_0`.
    pub fn artifact_key(&self) -> String {
        self.deltas
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl std::fmt::Display for WeightVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, w) in self.deltas.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{w}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_coefficient_is_derived() {
        let wv = WeightVector::new(vec![0.2, 0.3, 0.1]);
        assert!((wv.base_coefficient() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn full_weights_sum_to_one() {
        let wv = WeightVector::new(vec![0.7, 0.4, 0.2, 0.1]);
        let sum: f64 = wv.full_weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn base_coefficient_can_go_negative() {
        let wv = WeightVector::ones(4);
        assert!((wv.base_coefficient() + 3.0).abs() < 1e-12);
        // Still sums to 1 overall
        let sum: f64 = wv.full_weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn artifact_key_encodes_components() {
        let wv = WeightVector::new(vec![1.0, 0.5, 0.25, 0.0]);
        assert_eq!(wv.artifact_key(), "1_0.5_0.25_0");
    }

    #[test]
    fn display_formatting() {
        let wv = WeightVector::new(vec![0.5, 0.5]);
        assert_eq!(wv.to_string(), "(0.5, 0.5)");
    }
}
