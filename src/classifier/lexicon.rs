//! Offline lexicon classifier.
//!
//! Scores words against a small mood lexicon (with negation and
//! intensifier handling) and turns the score into a three-class
//! softmax distribution.

use super::{raw_scores, Classifier, ClassifierError, RawScores};
use async_trait::async_trait;
use std::collections::HashMap;

/// Softmax sharpness.
const TEMPERATURE_SCALE: f64 = 4.0;

/// Scores with magnitude below this lean neutral.
const NEUTRAL_BAND: f64 = 0.25;

/// Smoothing constant for squashing the raw sum into [-1, 1].
const NORMALIZATION_ALPHA: f64 = 15.0;

/// How many tokens a negation reaches forward.
const NEGATION_WINDOW: usize = 3;

/// Rule-based classifier for personal journaling text.
pub struct LexiconClassifier {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconClassifier {
    pub fn new() -> Self {
        let words: HashMap<&'static str, f64> = [
            // Positive
            ("happy", 0.8),
            ("joy", 0.8),
            ("joyful", 0.8),
            ("love", 0.8),
            ("loved", 0.8),
            ("grateful", 0.7),
            ("thankful", 0.7),
            ("excited", 0.7),
            ("proud", 0.6),
            ("calm", 0.5),
            ("relaxed", 0.5),
            ("peaceful", 0.6),
            ("hopeful", 0.6),
            ("great", 0.6),
            ("good", 0.5),
            ("wonderful", 0.8),
            ("amazing", 0.8),
            ("fun", 0.5),
            ("glad", 0.6),
            ("better", 0.4),
            ("nice", 0.4),
            ("enjoyed", 0.6),
            ("smile", 0.5),
            ("laughed", 0.6),
            ("rested", 0.4),
            // Negative
            ("sad", -0.7),
            ("unhappy", -0.7),
            ("angry", -0.7),
            ("anxious", -0.6),
            ("anxiety", -0.6),
            ("stressed", -0.6),
            ("worried", -0.5),
            ("tired", -0.4),
            ("exhausted", -0.6),
            ("lonely", -0.7),
            ("depressed", -0.9),
            ("awful", -0.8),
            ("terrible", -0.8),
            ("horrible", -0.8),
            ("hate", -0.8),
            ("upset", -0.6),
            ("hurt", -0.6),
            ("scared", -0.6),
            ("afraid", -0.6),
            ("frustrated", -0.6),
            ("bad", -0.5),
            ("worse", -0.6),
            ("cried", -0.6),
            ("crying", -0.6),
            ("overwhelmed", -0.6),
            ("miserable", -0.9),
        ]
        .into_iter()
        .collect();

        let negations = vec![
            "not", "no", "never", "nothing", "nobody", "none", "cannot", "cant", "can't", "don't",
            "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt", "wasn't", "wasnt",
            "won't", "wont", "hardly", "barely",
        ];

        let intensifiers: HashMap<&'static str, f64> = [
            ("very", 1.5),
            ("really", 1.4),
            ("so", 1.3),
            ("extremely", 2.0),
            ("incredibly", 1.8),
            ("totally", 1.5),
            ("slightly", 0.5),
            ("somewhat", 0.7),
            ("kind", 0.8),
            ("little", 0.7),
        ]
        .into_iter()
        .collect();

        Self {
            words,
            negations,
            intensifiers,
        }
    }

    /// Lexicon score in [-1, 1]; 0 when no mood words are present.
    pub fn score(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut sum = 0.0;
        let mut negation_left = 0usize;
        let mut multiplier = 1.0;

        for token in &tokens {
            let token = token.as_str();

            if self.negations.contains(&token) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if let Some(boost) = self.intensifiers.get(token) {
                multiplier *= boost;
                continue;
            }

            if let Some(base) = self.words.get(token) {
                let mut value = base * multiplier;
                if negation_left > 0 {
                    value = -value * 0.75;
                }
                sum += value;
                multiplier = 1.0;
                negation_left = 0;
            } else {
                negation_left = negation_left.saturating_sub(1);
            }
        }

        sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()
    }

    /// Three-class distribution for a score, ordered negative/neutral/positive.
    pub fn distribution(score: f64) -> [f64; 3] {
        let logits = [
            -TEMPERATURE_SCALE * score,
            TEMPERATURE_SCALE * (NEUTRAL_BAND - score.abs()),
            TEMPERATURE_SCALE * score,
        ];
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        [exps[0] / total, exps[1] / total, exps[2] / total]
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('\'').to_lowercase())
        .collect()
}

#[async_trait]
impl Classifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> Result<RawScores, ClassifierError> {
        let [negative, neutral, positive] = Self::distribution(self.score(text));
        Ok(raw_scores(negative, neutral, positive))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}
