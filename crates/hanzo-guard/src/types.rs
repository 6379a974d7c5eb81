//! Core types for Hanzo Guard

use crate::assessment::{Assessment, ThreatLevel};
use crate::config::ThresholdConfig;
use chrono::{DateTime, Utc};
use hanzo_preprocess::PreprocessReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What the caller should do with the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Safe,
    AllowWithWarning,
    Block,
}

impl Decision {
    /// Map a score with the default bands (>=7 block, 5-6 warn, <=4 safe).
    pub fn from_score(score: u8) -> Self {
        Self::with_thresholds(score, &ThresholdConfig::default())
    }

    pub fn with_thresholds(score: u8, thresholds: &ThresholdConfig) -> Self {
        if score >= thresholds.block_at {
            Decision::Block
        } else if score >= thresholds.warn_at {
            Decision::AllowWithWarning
        } else {
            Decision::Safe
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Decision::Block => Status::Blocked,
            _ => Status::Allowed,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Decision::Safe => RiskLevel::Low,
            Decision::AllowWithWarning => RiskLevel::Medium,
            Decision::Block => RiskLevel::High,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Safe => write!(f, "SAFE"),
            Decision::AllowWithWarning => write!(f, "ALLOW_WITH_WARNING"),
            Decision::Block => write!(f, "BLOCK"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Allowed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Final-gate outcome for one text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub status: Status,
    pub risk_level: RiskLevel,
    /// Classifier score; absent when the classifier was not consulted or failed
    pub threat_score: Option<u8>,
    /// Score scaled to 0.0..=1.0
    pub ml_score: Option<f32>,
    pub threat_level: Option<ThreatLevel>,
    pub reason: String,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl Verdict {
    fn base(decision: Decision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            status: decision.status(),
            risk_level: decision.risk_level(),
            threat_score: None,
            ml_score: None,
            threat_level: None,
            reason: reason.into(),
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    /// Blank input; the classifier is never called.
    pub fn empty() -> Self {
        let mut verdict = Self::base(Decision::Safe, "Empty input");
        verdict.ml_score = Some(0.0);
        verdict
    }

    /// Map a classifier assessment through the configured bands.
    pub fn from_assessment(assessment: &Assessment, thresholds: &ThresholdConfig) -> Self {
        let decision = Decision::with_thresholds(assessment.score, thresholds);
        let reason = match decision {
            Decision::Block if assessment.reason.is_empty() => {
                "High-confidence injection detected".to_string()
            }
            Decision::AllowWithWarning if assessment.reason.is_empty() => {
                "Suspicious patterns detected".to_string()
            }
            _ => assessment.reason.clone(),
        };
        Self {
            threat_score: Some(assessment.score),
            ml_score: Some(assessment.ml_score()),
            threat_level: Some(assessment.threat_level()),
            ..Self::base(decision, reason)
        }
    }

    /// The classifier could not answer; block.
    pub fn fail_safe(error: impl fmt::Display) -> Self {
        Self::base(Decision::Block, format!("Security check failed: {}", error))
    }

    pub fn is_blocked(&self) -> bool {
        self.status == Status::Blocked
    }

    pub fn with_context(mut self, context: &GuardContext) -> Self {
        self.request_id = context.request_id;
        self
    }
}

/// Verdict plus the preprocessing report it was computed from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub report: PreprocessReport,
}

impl Evaluation {
    pub fn is_blocked(&self) -> bool {
        self.verdict.is_blocked()
    }
}

/// Live-typing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealtimeLevel {
    Safe,
    Warning,
    Block,
}

impl From<Decision> for RealtimeLevel {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Safe => RealtimeLevel::Safe,
            Decision::AllowWithWarning => RealtimeLevel::Warning,
            Decision::Block => RealtimeLevel::Block,
        }
    }
}

/// Result of one realtime check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeStatus {
    pub status: RealtimeLevel,
    pub ml_score: f32,
    /// True when the previous score was reused
    pub cached: bool,
    /// Classifier reason, present only on a fresh classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Classifier failure, if any; the status is then SAFE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request context for guard operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardContext {
    /// Unique request ID
    pub request_id: Uuid,
    /// User identifier (optional)
    pub user_id: Option<String>,
    /// Session identifier (optional)
    pub session_id: Option<String>,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Default for GuardContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
            timestamp: Utc::now(),
        }
    }
}

impl GuardContext {
    /// Create a new context with a fresh request ID
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub context: GuardContext,
    /// Hash of the evaluated text, never the text itself
    pub content_hash: String,
    pub decision: Decision,
    pub threat_score: Option<u8>,
    pub reason: String,
    pub processing_time_ms: u64,
}
