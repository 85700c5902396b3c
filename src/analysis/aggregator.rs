//! Paragraph aggregation.
//!
//! Combines per-paragraph predictions into one entry-level mood. Each
//! paragraph is weighted by its length and by how recent it is, weights are
//! normalized, and the weighted predictions are summed per class.

use crate::classifier::{canonicalize, Classifier};
use crate::models::{Mood, MoodAnalysis, MoodDistribution};
use tracing::{debug, warn};

/// Tunables of the weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightingParams {
    /// Exponent `p` applied to the (floored) character length.
    pub length_exponent: f64,
    /// Gain `gamma`: the newest paragraph gets `1 + gamma` times the
    /// recency factor of the oldest.
    pub recency_gain: f64,
}

impl Default for WeightingParams {
    fn default() -> Self {
        Self {
            length_exponent: 1.0,
            recency_gain: 0.2,
        }
    }
}

/// Stateless entry-level aggregator shared by every write path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    params: WeightingParams,
}

impl Aggregator {
    pub fn new(params: WeightingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> WeightingParams {
        self.params
    }

    /// Aggregate all paragraphs of an entry, oldest first.
    ///
    /// Never fails: a paragraph whose prediction cannot be obtained or read
    /// contributes the fallback distribution instead.
    pub async fn aggregate(&self, classifier: &dyn Classifier, texts: &[String]) -> MoodAnalysis {
        if texts.is_empty() {
            return MoodAnalysis::empty();
        }

        let mut predictions = Vec::with_capacity(texts.len());
        for (idx, text) in texts.iter().enumerate() {
            let prediction = match classifier.classify(text).await {
                Ok(raw) => canonicalize(&raw),
                Err(e) => Err(e),
            };
            predictions.push(prediction.unwrap_or_else(|e| {
                warn!(paragraph = idx, error = %e, "Using fallback distribution");
                MoodDistribution::FALLBACK
            }));
        }

        let weights = paragraph_weights(texts, &self.params);
        let analysis = combine(&weights, &predictions);

        debug!(
            paragraphs = texts.len(),
            label = %analysis.label,
            mass = analysis.probabilities.total(),
            "Aggregated entry mood"
        );

        analysis
    }
}

/// Normalized weight for every paragraph.
///
/// A single paragraph always gets weight `1.0`.
pub fn paragraph_weights(texts: &[String], params: &WeightingParams) -> Vec<f64> {
    let n = texts.len();
    if n == 1 {
        return vec![1.0];
    }

    let raw: Vec<f64> = texts
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let length = text.chars().count().max(1) as f64;
            let length_component = length.powf(params.length_exponent);
            let recency_norm = idx as f64 / (n - 1) as f64;
            let recency_component = 1.0 + params.recency_gain * recency_norm;
            length_component * recency_component
        })
        .collect();

    normalize(raw)
}

/// Scale weights to sum to 1. A zero total is treated as 1, which leaves
/// all-zero weights in place. A total that overflowed takes the same path.
fn normalize(weights: Vec<f64>) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() {
        warn!(total = sum, "Paragraph weights overflowed; using zero weights");
        return vec![0.0; weights.len()];
    }
    let total = if sum == 0.0 { 1.0 } else { sum };
    weights.into_iter().map(|w| w / total).collect()
}

/// Weighted per-class sum; the label is the top class.
fn combine(weights: &[f64], predictions: &[MoodDistribution]) -> MoodAnalysis {
    let mut probabilities = MoodDistribution::ZERO;
    for (weight, prediction) in weights.iter().zip(predictions) {
        for mood in Mood::ALL {
            *probabilities.get_mut(mood) += prediction.get(mood) * weight;
        }
    }

    MoodAnalysis {
        label: probabilities.top(),
        probabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{raw_scores, ClassifierError, RawScores};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the same scores for every text.
    struct ConstantClassifier(RawScores);

    #[async_trait]
    impl Classifier for ConstantClassifier {
        async fn classify(&self, _text: &str) -> Result<RawScores, ClassifierError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    /// Looks up scores by exact text; unknown texts fail.
    struct TableClassifier {
        table: HashMap<String, Result<RawScores, String>>,
        calls: AtomicUsize,
    }

    impl TableClassifier {
        fn new(rows: Vec<(&str, Result<RawScores, String>)>) -> Self {
            Self {
                table: rows.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Classifier for TableClassifier {
        async fn classify(&self, text: &str) -> Result<RawScores, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.table.get(text) {
                Some(Ok(raw)) => Ok(raw.clone()),
                Some(Err(msg)) => Err(ClassifierError::Request(msg.clone())),
                None => Err(ClassifierError::Unavailable(format!("no row for {:?}", text))),
            }
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn test_empty_entry_returns_fallback() {
        let classifier = ConstantClassifier(raw_scores(1.0, 0.0, 0.0));
        let result = Aggregator::default().aggregate(&classifier, &[]).await;

        assert_eq!(result.label, Mood::Neutral);
        assert_eq!(result.probabilities, MoodDistribution::FALLBACK);
        assert_eq!(result.probabilities.negative, 0.33);
        assert_eq!(result.probabilities.neutral, 0.34);
        assert_eq!(result.probabilities.positive, 0.33);
    }

    #[tokio::test]
    async fn test_single_paragraph_passes_prediction_through() {
        let classifier = ConstantClassifier(raw_scores(0.05, 0.85, 0.10));
        let result = Aggregator::default()
            .aggregate(&classifier, &texts(&["okay"]))
            .await;

        assert_eq!(result.label, Mood::Neutral);
        assert_eq!(
            result.probabilities,
            MoodDistribution {
                negative: 0.05,
                neutral: 0.85,
                positive: 0.10,
            }
        );
    }

    #[tokio::test]
    async fn test_single_paragraph_ignores_length_and_recency() {
        let classifier = ConstantClassifier(raw_scores(0.2, 0.3, 0.5));
        let params = WeightingParams {
            length_exponent: 3.0,
            recency_gain: 10.0,
        };
        let long = "x".repeat(500);
        let result = Aggregator::new(params)
            .aggregate(&classifier, &[long])
            .await;

        assert_eq!(result.probabilities.negative, 0.2);
        assert_eq!(result.probabilities.neutral, 0.3);
        assert_eq!(result.probabilities.positive, 0.5);
    }

    #[tokio::test]
    async fn test_length_and_recency_weighting() {
        let first = "a".repeat(10);
        let second = "b".repeat(30);
        let classifier = TableClassifier::new(vec![
            (first.as_str(), Ok(raw_scores(1.0, 0.0, 0.0))),
            (second.as_str(), Ok(raw_scores(0.0, 0.0, 1.0))),
        ]);

        let entry = vec![first.clone(), second.clone()];
        let weights = paragraph_weights(&entry, &WeightingParams::default());
        assert_close(weights[0], 10.0 / 46.0);
        assert_close(weights[1], 36.0 / 46.0);
        assert_close(weights[0], 0.2174);
        assert_close(weights[1], 0.7826);

        let result = Aggregator::default().aggregate(&classifier, &entry).await;
        assert_eq!(result.label, Mood::Positive);
        assert_close(result.probabilities.negative, 0.2174);
        assert_eq!(result.probabilities.neutral, 0.0);
        assert_close(result.probabilities.positive, 0.7826);
    }

    #[tokio::test]
    async fn test_probabilities_sum_to_one() {
        let classifier = TableClassifier::new(vec![
            ("rough morning", Ok(raw_scores(0.7, 0.2, 0.1))),
            ("lunch with sam", Ok(raw_scores(0.1, 0.6, 0.3))),
            ("", Ok(raw_scores(0.3, 0.3, 0.4))),
            ("great evening walk", Ok(raw_scores(0.05, 0.15, 0.8))),
        ]);
        let entry = texts(&["rough morning", "lunch with sam", "", "great evening walk"]);

        let result = Aggregator::default().aggregate(&classifier, &entry).await;
        let dist = result.probabilities;

        assert!(dist.negative >= 0.0 && dist.neutral >= 0.0 && dist.positive >= 0.0);
        assert!((dist.total() - 1.0).abs() < 1e-9);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_malformed_prediction_uses_fallback() {
        let missing_key: RawScores = serde_json::from_value(json!({"0": 0.5, "2": 0.5})).unwrap();
        let classifier = TableClassifier::new(vec![
            ("first", Ok(raw_scores(0.0, 0.0, 1.0))),
            ("second", Ok(missing_key)),
            ("third", Err("model exploded".to_string())),
        ]);
        let entry = texts(&["first", "second", "third"]);

        let result = Aggregator::default().aggregate(&classifier, &entry).await;
        let weights = paragraph_weights(&entry, &WeightingParams::default());

        let fallback = MoodDistribution::FALLBACK;
        let expected_negative =
            0.0 * weights[0] + fallback.negative * weights[1] + fallback.negative * weights[2];
        let expected_positive =
            1.0 * weights[0] + fallback.positive * weights[1] + fallback.positive * weights[2];

        assert_close(result.probabilities.negative, expected_negative);
        assert_close(result.probabilities.positive, expected_positive);
        assert!((result.probabilities.total() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tie_breaks_in_canonical_order() {
        let classifier = ConstantClassifier(raw_scores(0.4, 0.4, 0.2));
        let result = Aggregator::default()
            .aggregate(&classifier, &texts(&["meh", "fine I guess"]))
            .await;
        assert_eq!(result.label, Mood::Negative);

        let classifier = ConstantClassifier(raw_scores(0.2, 0.4, 0.4));
        let result = Aggregator::default()
            .aggregate(&classifier, &texts(&["meh"]))
            .await;
        assert_eq!(result.label, Mood::Neutral);
    }

    #[tokio::test]
    async fn test_aggregation_is_idempotent() {
        let classifier = TableClassifier::new(vec![
            ("one", Ok(raw_scores(0.31, 0.29, 0.40))),
            ("two two", Ok(raw_scores(0.12, 0.53, 0.35))),
            ("three three three", Ok(raw_scores(0.61, 0.27, 0.12))),
        ]);
        let entry = texts(&["one", "two two", "three three three"]);
        let aggregator = Aggregator::default();

        let a = aggregator.aggregate(&classifier, &entry).await;
        let b = aggregator.aggregate(&classifier, &entry).await;

        assert_eq!(a.label, b.label);
        assert_eq!(
            a.probabilities.negative.to_bits(),
            b.probabilities.negative.to_bits()
        );
        assert_eq!(
            a.probabilities.neutral.to_bits(),
            b.probabilities.neutral.to_bits()
        );
        assert_eq!(
            a.probabilities.positive.to_bits(),
            b.probabilities.positive.to_bits()
        );
    }

    #[test]
    fn test_last_weight_grows_with_recency_gain() {
        let entry = texts(&["same length", "same length", "same length"]);
        let mut previous = 0.0;
        for gain in [0.0, 0.1, 0.2, 0.5, 1.0, 3.0] {
            let params = WeightingParams {
                length_exponent: 1.0,
                recency_gain: gain,
            };
            let weights = paragraph_weights(&entry, &params);
            let last = weights[2];
            assert!(last >= previous, "gain {gain}: {last} < {previous}");
            previous = last;
        }
        // With no gain, equal lengths weigh equally.
        let flat = paragraph_weights(
            &entry,
            &WeightingParams {
                length_exponent: 1.0,
                recency_gain: 0.0,
            },
        );
        assert_close(flat[0], 1.0 / 3.0);
    }

    #[test]
    fn test_empty_paragraph_length_is_floored() {
        let entry = texts(&["", "x"]);
        let weights = paragraph_weights(
            &entry,
            &WeightingParams {
                length_exponent: 1.0,
                recency_gain: 0.0,
            },
        );
        assert_close(weights[0], 0.5);
        assert_close(weights[1], 0.5);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let entry = texts(&["ééé", "abc"]);
        let weights = paragraph_weights(
            &entry,
            &WeightingParams {
                length_exponent: 1.0,
                recency_gain: 0.0,
            },
        );
        assert_close(weights[0], 0.5);
    }

    #[test]
    fn test_zero_total_leaves_zero_weights() {
        assert_eq!(normalize(vec![0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);

        let result = combine(
            &[0.0, 0.0],
            &[MoodDistribution::FALLBACK, MoodDistribution::FALLBACK],
        );
        assert_eq!(result.probabilities, MoodDistribution::ZERO);
        assert_eq!(result.label, Mood::Negative);
    }

    #[test]
    fn test_overflowed_total_leaves_zero_weights() {
        assert_eq!(normalize(vec![f64::INFINITY, 1.0]), vec![0.0, 0.0]);
        assert_eq!(normalize(vec![f64::NAN, 1.0]), vec![0.0, 0.0]);

        let entry = vec!["a".repeat(10), "b".repeat(30)];
        let weights = paragraph_weights(
            &entry,
            &WeightingParams {
                length_exponent: 400.0,
                recency_gain: 0.2,
            },
        );
        assert!(weights.iter().all(|w| *w == 0.0));

        let result = combine(
            &weights,
            &[MoodDistribution::FALLBACK, MoodDistribution::FALLBACK],
        );
        for mood in Mood::ALL {
            assert!(!result.probabilities.get(mood).is_nan());
        }
    }

    #[test]
    fn test_weights_match_paragraph_count() {
        let entry = texts(&["a", "bb", "ccc", "dddd", "eeeee"]);
        let weights = paragraph_weights(&entry, &WeightingParams::default());
        assert_eq!(weights.len(), entry.len());
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
