//! Live-typing hints
//!
//! A [`RealtimeSession`] belongs to one caller (one text box, one user). It
//! only asks the classifier again once the text has grown or shrunk by
//! `min_char_delta` characters since the last scored text, and otherwise
//! answers from the previous score. Failures report SAFE with the error
//! attached: the realtime hint is never the final gate.

use crate::classifier::Classifier;
use crate::config::{RealtimeConfig, ThresholdConfig};
use crate::types::{Decision, RealtimeLevel, RealtimeStatus};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RealtimeSession {
    classifier: Arc<dyn Classifier>,
    thresholds: ThresholdConfig,
    min_char_delta: usize,
    last_len: usize,
    last_score: u8,
}

impl RealtimeSession {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        config: &RealtimeConfig,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            classifier,
            thresholds,
            min_char_delta: config.min_char_delta,
            last_len: 0,
            last_score: 0,
        }
    }

    /// Hint for the current contents of the input.
    pub async fn check(&mut self, text: &str) -> RealtimeStatus {
        if text.trim().is_empty() {
            return RealtimeStatus {
                status: RealtimeLevel::Safe,
                ml_score: 0.0,
                cached: false,
                reason: None,
                error: None,
            };
        }

        let len = text.chars().count();
        if len.abs_diff(self.last_len) < self.min_char_delta {
            debug!(len, last_len = self.last_len, "Realtime check served from cache");
            return self.status(self.last_score, None);
        }

        match self.classifier.classify(text).await {
            Ok(assessment) => {
                self.last_len = len;
                self.last_score = assessment.score;
                self.status(assessment.score, Some(assessment.reason))
            }
            Err(e) => {
                warn!(classifier = self.classifier.name(), error = %e, "Realtime check failed");
                RealtimeStatus {
                    status: RealtimeLevel::Safe,
                    ml_score: 0.0,
                    cached: false,
                    reason: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Forget the previous score.
    pub fn reset(&mut self) {
        self.last_len = 0;
        self.last_score = 0;
    }

    /// Character count and score of the last classified text
    pub fn last_scored(&self) -> (usize, u8) {
        (self.last_len, self.last_score)
    }

    /// `reason` is `None` when the score comes from the cache.
    fn status(&self, score: u8, reason: Option<String>) -> RealtimeStatus {
        RealtimeStatus {
            status: Decision::with_thresholds(score, &self.thresholds).into(),
            ml_score: score as f32 / 10.0,
            cached: reason.is_none(),
            reason,
            error: None,
        }
    }
}

impl std::fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("classifier", &self.classifier.name())
            .field("min_char_delta", &self.min_char_delta)
            .field("last_len", &self.last_len)
            .field("last_score", &self.last_score)
            .finish()
    }
}
