//! Sentiment analysis.
//!
//! Entry-level aggregation lives in [`aggregator`]; this module also offers
//! one-shot analysis of a single text.

pub mod aggregator;

pub use aggregator::{Aggregator, WeightingParams};

use crate::classifier::{canonicalize_partial, Classifier, ClassifierError};
use crate::models::MoodAnalysis;

/// Classify one text without any weighting.
///
/// Unlike entry aggregation, failures are returned to the caller. Classes
/// the model did not report are filled with `0.0`.
pub async fn analyze_text(
    classifier: &dyn Classifier,
    text: &str,
) -> Result<MoodAnalysis, ClassifierError> {
    let raw = classifier.classify(text).await?;
    let probabilities = canonicalize_partial(&raw)?;
    Ok(MoodAnalysis {
        label: probabilities.top(),
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{raw_scores, RawScores};
    use crate::models::Mood;
    use async_trait::async_trait;

    struct Fixed(Result<RawScores, ()>);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _text: &str) -> Result<RawScores, ClassifierError> {
            self.0
                .clone()
                .map_err(|_| ClassifierError::Unavailable("model not loaded".to_string()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_analyze_text_picks_top_class() {
        let classifier = Fixed(Ok(raw_scores(0.1, 0.2, 0.7)));
        let result = analyze_text(&classifier, "I like this").await.unwrap();
        assert_eq!(result.label, Mood::Positive);
        assert!((result.probabilities.positive - 0.7).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_analyze_text_propagates_classifier_error() {
        let classifier = Fixed(Err(()));
        let err = analyze_text(&classifier, "anything").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
