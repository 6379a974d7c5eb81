//! Classifier assessments
//!
//! The classifier answers in a small line format:
//!
//! ```text
//! SCORE: 8
//! CATEGORY: INJECTION
//! REASON: asks the model to ignore its instructions
//! ```
//!
//! Parsing fails closed: anything missing or unreadable leaves the score at
//! 10, and the category is always re-derived from the score.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest (most dangerous) score.
pub const MAX_SCORE: u8 = 10;

/// Lowest score.
pub const MIN_SCORE: u8 = 1;

/// Coarse category reported with a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Safe,
    Warning,
    Injection,
}

impl Category {
    /// 1-4 safe, 5-6 warning, 7-10 injection
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=4 => Category::Safe,
            5..=6 => Category::Warning,
            _ => Category::Injection,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Safe => write!(f, "SAFE"),
            Category::Warning => write!(f, "WARNING"),
            Category::Injection => write!(f, "INJECTION"),
        }
    }
}

/// Human-facing threat band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Minimal,
    Low,
    Moderate,
    Elevated,
    High,
    Severe,
    Critical,
}

impl ThreatLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            1..=2 => ThreatLevel::Minimal,
            3..=4 => ThreatLevel::Low,
            5 => ThreatLevel::Moderate,
            6 => ThreatLevel::Elevated,
            7 => ThreatLevel::High,
            8 => ThreatLevel::Severe,
            _ => ThreatLevel::Critical,
        }
    }

    /// Five-segment gauge, e.g. `■■■□□ HIGH`
    ///
    /// Not monotonic in severity: MINIMAL and CRITICAL both show a full bar.
    pub fn indicator(&self) -> String {
        let filled = match self {
            ThreatLevel::Minimal => 5,
            ThreatLevel::Low => 4,
            ThreatLevel::Moderate => 3,
            ThreatLevel::Elevated => 4,
            ThreatLevel::High => 3,
            ThreatLevel::Severe => 4,
            ThreatLevel::Critical => 5,
        };
        format!("{}{} {}", "■".repeat(filled), "□".repeat(5 - filled), self)
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThreatLevel::Minimal => "MINIMAL",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Moderate => "MODERATE",
            ThreatLevel::Elevated => "ELEVATED",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Severe => "SEVERE",
            ThreatLevel::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// A classifier's judgement of one text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Threat score, 1 (benign) to 10 (certain injection)
    pub score: u8,
    /// Always consistent with `score`
    pub category: Category,
    /// One-sentence explanation
    pub reason: String,
    /// Unparsed classifier output, when there was one
    pub raw_response: Option<String>,
}

impl Assessment {
    /// Build an assessment, clamping the score and deriving the category.
    pub fn new(score: u8, reason: impl Into<String>) -> Self {
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        Self {
            score,
            category: Category::from_score(score),
            reason: reason.into(),
            raw_response: None,
        }
    }

    /// Parse the `SCORE:` / `CATEGORY:` / `REASON:` line format.
    ///
    /// Keys are case-insensitive and may appear in any order. The first
    /// number on the `SCORE:` line is truncated and clamped to 1..=10. The
    /// category line is read but then overridden by the score.
    pub fn parse(response: &str) -> Self {
        let mut score = MAX_SCORE;
        let mut reason = "Unable to parse response".to_string();

        for line in response.trim().lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_uppercase().as_str() {
                "SCORE" => {
                    if let Some(parsed) = leading_number(value) {
                        score = parsed.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8;
                    }
                }
                "REASON" if !value.is_empty() => reason = value.to_string(),
                _ => {}
            }
        }

        Self {
            score,
            category: Category::from_score(score),
            reason,
            raw_response: Some(response.to_string()),
        }
    }

    /// Fail-closed assessment for a classifier that could not answer.
    pub fn failed(error: impl fmt::Display) -> Self {
        Self::new(MAX_SCORE, format!("Security check failed: {}", error))
    }

    pub fn threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_score(self.score)
    }

    /// Score scaled to 0.0..=1.0
    pub fn ml_score(&self) -> f32 {
        self.score as f32 / MAX_SCORE as f32
    }
}

fn leading_number(value: &str) -> Option<f64> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let rest = &value[start..];
    let end = rest
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*c == '.' && *i > 0)))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let assessment = Assessment::parse("SCORE: 8\nCATEGORY: INJECTION\nREASON: Requests system prompt.");
        assert_eq!(assessment.score, 8);
        assert_eq!(assessment.category, Category::Injection);
        assert_eq!(assessment.reason, "Requests system prompt.");
        assert_eq!(assessment.threat_level(), ThreatLevel::Severe);
    }

    #[test]
    fn test_category_follows_score() {
        let assessment = Assessment::parse("SCORE: 2\nCATEGORY: INJECTION\nREASON: benign question");
        assert_eq!(assessment.category, Category::Safe);

        let assessment = Assessment::parse("score: 6\ncategory: safe");
        assert_eq!(assessment.category, Category::Warning);
    }

    #[test]
    fn test_unparsable_fails_closed() {
        let assessment = Assessment::parse("I cannot help with that.");
        assert_eq!(assessment.score, 10);
        assert_eq!(assessment.category, Category::Injection);
        assert_eq!(assessment.reason, "Unable to parse response");
        assert!(assessment.raw_response.is_some());

        let assessment = Assessment::parse("SCORE: high\nREASON: unclear");
        assert_eq!(assessment.score, 10);
    }

    #[test]
    fn test_score_clamped_and_truncated() {
        assert_eq!(Assessment::parse("SCORE: 0").score, 1);
        assert_eq!(Assessment::parse("SCORE: 42").score, 10);
        assert_eq!(Assessment::parse("SCORE: 6.9").score, 6);
        assert_eq!(Assessment::parse("SCORE: 7/10").score, 7);
        assert_eq!(Assessment::parse("SCORE: [3]").score, 3);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("7."), Some(7.0));
        assert_eq!(leading_number("about 4.5 out of 10"), Some(4.5));
        assert_eq!(leading_number("none"), None);
    }

    #[test]
    fn test_threat_levels() {
        let levels: Vec<ThreatLevel> = (1..=10).map(ThreatLevel::from_score).collect();
        assert_eq!(
            levels,
            [
                ThreatLevel::Minimal,
                ThreatLevel::Minimal,
                ThreatLevel::Low,
                ThreatLevel::Low,
                ThreatLevel::Moderate,
                ThreatLevel::Elevated,
                ThreatLevel::High,
                ThreatLevel::Severe,
                ThreatLevel::Critical,
                ThreatLevel::Critical,
            ]
        );
    }

    #[test]
    fn test_indicator_segments() {
        assert_eq!(ThreatLevel::Minimal.indicator(), "■■■■■ MINIMAL");
        assert_eq!(ThreatLevel::Low.indicator(), "■■■■□ LOW");
        assert_eq!(ThreatLevel::Moderate.indicator(), "■■■□□ MODERATE");
        assert_eq!(ThreatLevel::Elevated.indicator(), "■■■■□ ELEVATED");
        assert_eq!(ThreatLevel::High.indicator(), "■■■□□ HIGH");
        assert_eq!(ThreatLevel::Severe.indicator(), "■■■■□ SEVERE");
        assert_eq!(ThreatLevel::Critical.indicator(), "■■■■■ CRITICAL");
    }

    #[test]
    fn test_failed_assessment() {
        let assessment = Assessment::failed("connection reset");
        assert_eq!(assessment.score, 10);
        assert_eq!(assessment.reason, "Security check failed: connection reset");
        assert_eq!(assessment.ml_score(), 1.0);
    }

    #[test]
    fn test_serialization() {
        let value = serde_json::to_value(Assessment::new(5, "odd")).unwrap();
        assert_eq!(value["category"], "WARNING");
        assert_eq!(value["score"], 5);
    }
}
