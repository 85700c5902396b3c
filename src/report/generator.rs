//! Text and JSON rendering of command results.
//!
//! Text output is meant for a terminal. JSON output wraps every result in an
//! envelope `{code, message, data}` so scripts see the same shape for
//! successes and failures.

use crate::models::{Entry, Journal, MoodAnalysis, MoodDistribution, RecomputeSummary, User};
use anyhow::Result;
use serde::Serialize;

const BAR_WIDTH: usize = 20;

/// Response envelope for JSON output.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    /// HTTP-equivalent status code.
    pub code: u16,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
}

/// Serialize a successful result.
pub fn generate_json_response<T: Serialize>(code: u16, message: &str, data: &T) -> Result<String> {
    let envelope = Envelope {
        code,
        message,
        data: Some(data),
    };
    serde_json::to_string_pretty(&envelope).map_err(Into::into)
}

/// Serialize a failure. Never fails.
pub fn generate_json_error(code: u16, message: &str) -> String {
    let envelope: Envelope<'_, ()> = Envelope {
        code,
        message,
        data: None,
    };
    serde_json::to_string_pretty(&envelope)
        .unwrap_or_else(|_| format!("{{\"code\": {}, \"message\": {:?}}}", code, message))
}

/// Account details.
pub fn generate_user_text(user: &User) -> String {
    let mut output = String::new();

    output.push_str(&format!("👤 {} (@{})\n", user.name, user.username));
    output.push_str(&format!("   ID: {}\n", user.id));
    if let Some(ref email) = user.email {
        output.push_str(&format!("   Email: {}\n", email));
    }
    output.push_str(&format!("   Role: {}\n", user.role));
    output.push_str(&format!(
        "   Joined: {}\n",
        user.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

/// One-line journal summary.
pub fn generate_journal_line(journal: &Journal) -> String {
    format!(
        "📓 #{} {} (created {})\n",
        journal.id,
        journal.title,
        journal.created_at.format("%Y-%m-%d")
    )
}

pub fn generate_journal_list_text(journals: &[Journal]) -> String {
    if journals.is_empty() {
        return "No journals yet.\n".to_string();
    }

    journals.iter().map(generate_journal_line).collect()
}

/// Full entry view: label, distribution and numbered paragraphs.
pub fn generate_entry_text(entry: &Entry) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "📝 Entry #{} in journal #{} ({})\n",
        entry.id,
        entry.journal_id,
        entry.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "   Mood: {} {}\n\n",
        entry.label.emoji(),
        entry.label
    ));
    output.push_str(&generate_distribution_block(&entry.probabilities));

    if entry.texts.is_empty() {
        output.push_str("\n   (no paragraphs yet)\n");
    } else {
        output.push('\n');
        for (i, text) in entry.texts.iter().enumerate() {
            output.push_str(&format!("   {}. {}\n", i + 1, text));
        }
    }

    output
}

/// Compact entry list.
pub fn generate_entry_list_text(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "No entries in this journal.\n".to_string();
    }

    let mut output = String::new();
    for entry in entries {
        output.push_str(&format!(
            "#{:<5} {} {:<8} {} paragraph(s)  {}\n",
            entry.id,
            entry.label.emoji(),
            entry.label.as_str(),
            entry.texts.len(),
            entry.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    output
}

/// Single-text analysis result.
pub fn generate_analysis_text(analysis: &MoodAnalysis) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Mood: {} {}\n\n",
        analysis.label.emoji(),
        analysis.label
    ));
    output.push_str(&generate_distribution_block(&analysis.probabilities));
    output
}

pub fn generate_recompute_text(summary: &RecomputeSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("🔁 Recomputed {} entries\n", summary.updated));
    if !summary.errors.is_empty() {
        output.push_str(&format!("⚠️  {} entries failed:\n", summary.errors.len()));
        for failure in &summary.errors {
            output.push_str(&format!("   #{}: {}\n", failure.entry_id, failure.error));
        }
    }

    output
}

fn generate_distribution_block(dist: &MoodDistribution) -> String {
    let mut block = String::new();
    for mood in crate::models::Mood::ALL {
        let p = dist.get(mood);
        block.push_str(&format!(
            "   {:<8} {} {:>5.1}%\n",
            mood.as_str(),
            probability_bar(p),
            p * 100.0
        ));
    }
    block
}

/// Fixed-width bar for a probability; out-of-range values are clamped.
fn probability_bar(p: f64) -> String {
    let clamped = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (clamped * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}
