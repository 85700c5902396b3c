//! Data models for the journaling backend.
//!
//! This module contains the core data structures shared across the
//! application: mood labels and distributions, users, journals and entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three canonical sentiment classes.
///
/// Declaration order is the tie-break order used when picking a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Negative,
    Neutral,
    Positive,
}

impl Mood {
    /// All classes in tie-break order.
    pub const ALL: [Mood; 3] = [Mood::Negative, Mood::Neutral, Mood::Positive];

    /// Maps a classifier class index to its canonical class.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Negative => "negative",
            Mood::Neutral => "neutral",
            Mood::Positive => "positive",
        }
    }

    /// Returns an emoji representation of the mood.
    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Negative => "🌧️",
            Mood::Neutral => "⛅",
            Mood::Positive => "☀️",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "negative" => Ok(Mood::Negative),
            "neutral" => Ok(Mood::Neutral),
            "positive" => Ok(Mood::Positive),
            other => Err(format!("unknown mood label: {}", other)),
        }
    }
}

/// Probability mass over the three canonical classes.
///
/// Serializes as `{"negative": .., "neutral": .., "positive": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodDistribution {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

impl Default for MoodDistribution {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl MoodDistribution {
    /// "No signal yet" distribution used for empty entries and
    /// unreadable classifier output.
    pub const FALLBACK: MoodDistribution = MoodDistribution {
        negative: 0.33,
        neutral: 0.34,
        positive: 0.33,
    };

    /// All-zero accumulator.
    pub const ZERO: MoodDistribution = MoodDistribution {
        negative: 0.0,
        neutral: 0.0,
        positive: 0.0,
    };

    pub fn get(&self, mood: Mood) -> f64 {
        match mood {
            Mood::Negative => self.negative,
            Mood::Neutral => self.neutral,
            Mood::Positive => self.positive,
        }
    }

    pub fn get_mut(&mut self, mood: Mood) -> &mut f64 {
        match mood {
            Mood::Negative => &mut self.negative,
            Mood::Neutral => &mut self.neutral,
            Mood::Positive => &mut self.positive,
        }
    }

    /// Sum of the three probabilities.
    pub fn total(&self) -> f64 {
        self.negative + self.neutral + self.positive
    }

    /// Class with the strictly largest probability; earlier classes win ties.
    pub fn top(&self) -> Mood {
        let mut best = Mood::Negative;
        for mood in Mood::ALL {
            if self.get(mood) > self.get(best) {
                best = mood;
            }
        }
        best
    }
}

/// Entry-level (or single-text) sentiment result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodAnalysis {
    /// Winning class.
    pub label: Mood,
    /// Probability per class.
    pub probabilities: MoodDistribution,
}

impl MoodAnalysis {
    /// Result for an entry with no paragraphs.
    pub fn empty() -> Self {
        Self {
            label: Mood::Neutral,
            probabilities: MoodDistribution::FALLBACK,
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// A registered account (without credentials).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unique login name.
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A journal owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A journal entry as presented to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub journal_id: i64,
    /// Paragraphs, oldest first.
    pub texts: Vec<String>,
    /// Most recent aggregate label (`neutral` until first analysis).
    pub label: Mood,
    /// Most recent aggregate distribution.
    pub probabilities: MoodDistribution,
    pub created_at: DateTime<Utc>,
}

/// One entry that could not be recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeFailure {
    pub entry_id: i64,
    pub error: String,
}

/// Outcome of an admin recompute run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecomputeSummary {
    /// Entries whose aggregate was rewritten.
    pub updated: usize,
    pub errors: Vec<RecomputeFailure>,
}
