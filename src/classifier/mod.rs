//! Per-paragraph sentiment classifiers.
//!
//! The rest of the crate talks to a model only through the [`Classifier`]
//! trait: text in, class-index-keyed probabilities out. Concrete backends
//! live in submodules and are picked from configuration.

pub mod http;
pub mod lexicon;

pub use http::HttpClassifier;
pub use lexicon::LexiconClassifier;

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::models::{Mood, MoodDistribution};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Raw model output: class index (`"0"`, `"1"`, `"2"`) to probability.
///
/// Values stay untyped so that a misbehaving model is detected when the
/// output is canonicalized rather than when it is decoded.
pub type RawScores = HashMap<String, Value>;

/// Failures reported by a classifier backend.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier request failed: {0}")]
    Request(String),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode classifier response: {0}")]
    Decode(String),

    #[error("malformed classifier output: {0}")]
    Malformed(String),
}

/// An opaque per-paragraph sentiment model.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one paragraph.
    async fn classify(&self, text: &str) -> Result<RawScores, ClassifierError>;

    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Verify the model can serve requests at all.
    async fn check_ready(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}

/// Build the classifier selected in configuration.
pub fn build_classifier(config: &ClassifierConfig) -> Result<Box<dyn Classifier>, ClassifierError> {
    match config.kind {
        ClassifierKind::Lexicon => Ok(Box::new(LexiconClassifier::new())),
        ClassifierKind::Http => Ok(Box::new(HttpClassifier::new(
            &config.url,
            config.timeout_seconds,
        )?)),
    }
}

/// Strictly map raw output onto the canonical classes.
///
/// Every key must be a known class index, every value a finite number, and
/// all three indices must be present.
pub fn canonicalize(raw: &RawScores) -> Result<MoodDistribution, ClassifierError> {
    let (dist, seen) = map_indices(raw)?;

    if let Some(missing) = seen.iter().position(|present| !present) {
        return Err(ClassifierError::Malformed(format!(
            "missing class index {}",
            missing
        )));
    }

    Ok(dist)
}

/// Map raw output onto the canonical classes, filling absent classes with 0.
pub fn canonicalize_partial(raw: &RawScores) -> Result<MoodDistribution, ClassifierError> {
    if raw.is_empty() {
        return Err(ClassifierError::Malformed(
            "empty probabilities from model".to_string(),
        ));
    }
    let (dist, _) = map_indices(raw)?;
    Ok(dist)
}

fn map_indices(raw: &RawScores) -> Result<(MoodDistribution, [bool; 3]), ClassifierError> {
    let mut dist = MoodDistribution::ZERO;
    let mut seen = [false; 3];

    for (key, value) in raw {
        let index: usize = key.trim().parse().map_err(|_| {
            ClassifierError::Malformed(format!("class index {:?} is not an integer", key))
        })?;
        let mood = Mood::from_index(index).ok_or_else(|| {
            ClassifierError::Malformed(format!("unknown class index {}", index))
        })?;
        let probability = value.as_f64().filter(|p| p.is_finite()).ok_or_else(|| {
            ClassifierError::Malformed(format!("probability for class {} is not numeric", key))
        })?;

        if seen[index] {
            return Err(ClassifierError::Malformed(format!(
                "class index {} appears more than once",
                index
            )));
        }
        *dist.get_mut(mood) = probability;
        seen[index] = true;
    }

    Ok((dist, seen))
}

/// Build raw output from three probabilities, in class-index order.
pub fn raw_scores(negative: f64, neutral: f64, positive: f64) -> RawScores {
    [negative, neutral, positive]
        .iter()
        .enumerate()
        .map(|(i, p)| (i.to_string(), Value::from(*p)))
        .collect()
}
