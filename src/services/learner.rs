// ============================================
// Gated Sparse Online Learner
// ============================================
//
// Converts one feedback event into a preference-vector update, applied
// independently per label:
//
//   if s >= tau:  u' = clip(u + alpha * y * s^gamma, -1, 1)
//   else:         u' = u * (1 - decay)
//
// Labels strongly implicated by the article get a signed, magnitude-scaled
// nudge (gamma sharpens confidence); weakly implicated labels decay slowly
// toward zero so noisy low-confidence classifications cannot drift the
// profile.

use crate::models::{LabelScores, ProfileVector};
use serde::Deserialize;

/// Gated-update hyperparameters
#[derive(Debug, Clone, Copy)]
pub struct GatedParams {
    /// Learning rate for above-threshold labels
    pub alpha: f64,
    /// Gating threshold; scores below it are treated as noise
    pub tau: f64,
    /// Per-update decay for below-threshold labels
    pub decay: f64,
    /// Confidence-sharpening exponent on the score
    pub gamma: f64,
}

impl Default for GatedParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            tau: 0.1,
            decay: 0.01,
            gamma: 2.0,
        }
    }
}

impl GatedParams {
    /// Per-request learning-rate override
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Apply the gated update for one feedback event.
///
/// Every label in `labels` is processed, not just labels with a nonzero
/// score; labels outside the set remain unchanged. `y` is +1 for like,
/// -1 for dislike. Pure and total: weights always land in [-1, 1].
pub fn apply_gated_update(
    current: &ProfileVector,
    scores: &LabelScores,
    labels: &[String],
    y: f64,
    params: &GatedParams,
) -> ProfileVector {
    let mut out = current.clone();

    for label in labels {
        let u = out.get(label).copied().unwrap_or(0.0);
        let s = scores.get(label).copied().unwrap_or(0.0).clamp(0.0, 1.0);

        let updated = if s >= params.tau {
            (u + params.alpha * y * s.powf(params.gamma)).clamp(-1.0, 1.0)
        } else {
            u * (1.0 - params.decay)
        };

        out.insert(label.clone(), updated);
    }

    out
}

/// How `aggregate_interactions` combines score vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    Sum,
    Mean,
}

/// One historical interaction used to seed a profile
#[derive(Debug, Clone)]
pub struct Interaction {
    pub scores: LabelScores,
    pub weight: f64,
}

/// Build an initial profile by summing (or averaging) score vectors: the
/// cold-start seeding path, independent of the gated learner. Weights apply
/// in `Sum` mode; `Mean` is the plain arithmetic mean over interactions.
pub fn aggregate_interactions(
    interactions: &[Interaction],
    method: AggregationMethod,
) -> ProfileVector {
    let mut vector = ProfileVector::new();

    for interaction in interactions {
        for (label, value) in &interaction.scores {
            let contribution = match method {
                AggregationMethod::Sum => value * interaction.weight,
                AggregationMethod::Mean => *value,
            };
            *vector.entry(label.clone()).or_insert(0.0) += contribution;
        }
    }

    if method == AggregationMethod::Mean && !interactions.is_empty() {
        let n = interactions.len() as f64;
        for value in vector.values_mut() {
            *value /= n;
        }
    }

    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scores(pairs: &[(&str, f64)]) -> LabelScores {
        pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect()
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strong_signal_nudges_weight() {
        let params = GatedParams::default();
        let current = ProfileVector::new();
        let updated = apply_gated_update(
            &current,
            &scores(&[("Sport", 0.8)]),
            &labels(&["Sport"]),
            1.0,
            &params,
        );

        // 0 + 0.1 * 1 * 0.8^2
        let weight = updated["Sport"];
        assert!((weight - 0.064).abs() < 1e-9);
    }

    #[test]
    fn test_dislike_pushes_negative() {
        let params = GatedParams::default();
        let updated = apply_gated_update(
            &ProfileVector::new(),
            &scores(&[("War", 0.9)]),
            &labels(&["War"]),
            -1.0,
            &params,
        );

        assert!(updated["War"] < 0.0);
    }

    #[test]
    fn test_no_signal_decays_geometrically() {
        let params = GatedParams::default();
        let mut profile: ProfileVector = HashMap::from([("Sport".to_string(), 0.5)]);
        let weak = scores(&[("Sport", 0.05)]);
        let set = labels(&["Sport"]);

        for _ in 0..10 {
            profile = apply_gated_update(&profile, &weak, &set, 1.0, &params);
        }

        let expected = 0.5 * (1.0 - params.decay).powi(10);
        assert!((profile["Sport"] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weights_stay_bounded() {
        let params = GatedParams::default().with_alpha(0.5);
        let strong = scores(&[("Sport", 1.0)]);
        let set = labels(&["Sport"]);

        let mut profile = ProfileVector::new();
        for _ in 0..20 {
            profile = apply_gated_update(&profile, &strong, &set, 1.0, &params);
        }
        assert_eq!(profile["Sport"], 1.0);

        for _ in 0..50 {
            profile = apply_gated_update(&profile, &strong, &set, -1.0, &params);
        }
        assert_eq!(profile["Sport"], -1.0);
    }

    #[test]
    fn test_labels_outside_set_untouched() {
        let params = GatedParams::default();
        let profile: ProfileVector =
            HashMap::from([("Sport".to_string(), 0.5), ("War".to_string(), -0.3)]);

        let updated = apply_gated_update(
            &profile,
            &scores(&[("Sport", 0.8)]),
            &labels(&["Sport"]),
            1.0,
            &params,
        );

        assert_eq!(updated["War"], -0.3);
    }

    #[test]
    fn test_score_clamped_to_unit_interval() {
        let params = GatedParams::default();
        let updated = apply_gated_update(
            &ProfileVector::new(),
            &scores(&[("Sport", 3.0)]),
            &labels(&["Sport"]),
            1.0,
            &params,
        );

        // clamped to s = 1.0 before the nudge
        assert!((updated["Sport"] - params.alpha).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_sum_weighted() {
        let interactions = vec![
            Interaction {
                scores: scores(&[("Sport", 0.5)]),
                weight: 2.0,
            },
            Interaction {
                scores: scores(&[("Sport", 0.3), ("War", 0.4)]),
                weight: 1.0,
            },
        ];

        let vector = aggregate_interactions(&interactions, AggregationMethod::Sum);
        assert!((vector["Sport"] - 1.3).abs() < 1e-12);
        assert!((vector["War"] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_mean() {
        let interactions = vec![
            Interaction {
                scores: scores(&[("Sport", 0.6)]),
                weight: 5.0, // ignored by mean
            },
            Interaction {
                scores: scores(&[("Sport", 0.2)]),
                weight: 1.0,
            },
        ];

        let vector = aggregate_interactions(&interactions, AggregationMethod::Mean);
        assert!((vector["Sport"] - 0.4).abs() < 1e-12);
    }
}
