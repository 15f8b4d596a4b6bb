//! Heuristic answer confidence.
//!
//! Points out of 100, from two views of the source count and one of question
//! specificity:
//!
//! | Factor | Points |
//! |--------|--------|
//! | sources: ≥3 / 2 / 1 | 30 / 20 / 10 |
//! | keyword hits in question: ≥3 / 2 / 1 | 40 / 25 / 15 |
//! | sources × 10, capped | ≤ 30 |
//!
//! The source count is deliberately counted twice.

use crate::models::ConfidenceLabel;

pub const NO_SOURCES_EXPLANATION: &str = "No relevant sources found";

/// Label plus a short human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confidence {
    pub label: ConfidenceLabel,
    pub explanation: &'static str,
}

/// Score an answer built from `source_count` retrieved chunks.
///
/// `keywords` are matched as lowercase substrings of the lowercased question.
pub fn score(source_count: usize, question: &str, keywords: &[String]) -> Confidence {
    if source_count == 0 {
        return Confidence {
            label: ConfidenceLabel::Low,
            explanation: NO_SOURCES_EXPLANATION,
        };
    }

    let points = points(source_count, question, keywords);

    let (label, explanation) = if points >= 75 {
        (
            ConfidenceLabel::High,
            "Multiple relevant sources with specific question",
        )
    } else if points >= 50 {
        (ConfidenceLabel::Medium, "Some relevant sources found")
    } else if points >= 25 {
        (ConfidenceLabel::LowMedium, "Limited sources or broad question")
    } else {
        (ConfidenceLabel::Low, "Few sources or very general question")
    };

    Confidence { label, explanation }
}

fn points(source_count: usize, question: &str, keywords: &[String]) -> u32 {
    let quantity = match source_count {
        0 => 0,
        1 => 10,
        2 => 20,
        _ => 30,
    };

    let q = question.to_lowercase();
    let hits = keywords
        .iter()
        .filter(|k| !k.is_empty() && q.contains(&k.to_lowercase()))
        .count();
    let specificity = match hits {
        0 => 0,
        1 => 15,
        2 => 25,
        _ => 40,
    };

    let relevance = (source_count.min(3) as u32) * 10;

    quantity + specificity + relevance
}
