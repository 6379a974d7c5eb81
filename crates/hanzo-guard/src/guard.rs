//! Main Guard implementation

use crate::audit::AuditLogger;
use crate::classifier::Classifier;
use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::realtime::RealtimeSession;
use crate::types::{Evaluation, GuardContext, Verdict};
use hanzo_preprocess::{Pipeline, PreprocessOutput, RawInput};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Characters of canonical text shown in debug events
const LOG_PREVIEW_CHARS: usize = 80;

/// Final gate between untrusted input and an LLM.
///
/// Guard preprocesses raw bytes into canonical text, asks the classifier for
/// an assessment and maps the score to a [`Verdict`]. When the classifier
/// fails, the verdict is BLOCK.
pub struct Guard {
    config: GuardConfig,
    classifier: Arc<dyn Classifier>,
    pipeline: Arc<Pipeline>,
    audit_logger: AuditLogger,
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("config", &self.config)
            .field("classifier", &self.classifier.name())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Guard {
    /// Create a Guard with the given configuration and classifier
    pub fn new(config: GuardConfig, classifier: impl Classifier + 'static) -> Result<Self> {
        Self::builder().config(config).classifier(classifier).build()
    }

    /// Create a builder for Guard
    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Decide on already-canonical text.
    ///
    /// Blank `text` is SAFE without consulting the classifier. A non-blank
    /// `prior_context` is prepended (space-separated) before classifying.
    pub async fn final_decision(&self, text: &str, prior_context: Option<&str>) -> Verdict {
        self.final_decision_with_context(text, prior_context, &GuardContext::default())
            .await
    }

    /// [`Guard::final_decision`] with caller-supplied request context
    pub async fn final_decision_with_context(
        &self,
        text: &str,
        prior_context: Option<&str>,
        context: &GuardContext,
    ) -> Verdict {
        let start = Instant::now();

        if text.trim().is_empty() {
            return Verdict::empty().with_context(context);
        }

        let combined = match prior_context.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prior) => format!("{} {}", prior, text).trim().to_string(),
            None => text.to_string(),
        };

        let verdict = match self.classifier.classify(&combined).await {
            Ok(assessment) => Verdict::from_assessment(&assessment, &self.config.thresholds),
            Err(e) => {
                warn!(
                    classifier = self.classifier.name(),
                    request_id = %context.request_id,
                    error = %e,
                    "Classifier failed, blocking"
                );
                Verdict::fail_safe(e)
            }
        }
        .with_context(context);

        self.audit_logger.log(
            context,
            &combined,
            &verdict,
            start.elapsed().as_millis() as u64,
        );
        verdict
    }

    /// Preprocess raw input, then decide on its canonical text.
    ///
    /// Preprocessing runs on the calling task. For large or hostile payloads
    /// prefer [`Guard::evaluate_with_timeout`].
    pub async fn evaluate(&self, input: &RawInput<'_>) -> Evaluation {
        let output = self.pipeline.process(input);
        self.decide(output, &GuardContext::default()).await
    }

    /// Preprocess on the blocking pool and decide, all within `timeout`.
    ///
    /// On timeout the blocking preprocessing task is detached, not aborted.
    pub async fn evaluate_with_timeout(
        &self,
        bytes: Vec<u8>,
        filename: Option<String>,
        timeout: Duration,
    ) -> Result<Evaluation> {
        let context = GuardContext::default();
        let pipeline = Arc::clone(&self.pipeline);

        let work = async {
            let output = tokio::task::spawn_blocking(move || {
                let input = RawInput {
                    bytes: &bytes,
                    filename: filename.as_deref(),
                };
                pipeline.process(&input)
            })
            .await?;
            Ok::<_, GuardError>(self.decide(output, &context).await)
        };

        match tokio::time::timeout(timeout, work).await {
            Ok(evaluation) => evaluation,
            Err(_) => {
                warn!(
                    request_id = %context.request_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Evaluation timed out"
                );
                Err(GuardError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// [`Guard::evaluate_with_timeout`] using the configured deadline
    pub async fn evaluate_bounded(
        &self,
        bytes: Vec<u8>,
        filename: Option<String>,
    ) -> Result<Evaluation> {
        let timeout = self.config.timeout.duration();
        self.evaluate_with_timeout(bytes, filename, timeout).await
    }

    /// Start a live-typing session sharing this guard's classifier.
    pub fn session(&self) -> RealtimeSession {
        RealtimeSession::new(
            Arc::clone(&self.classifier),
            &self.config.realtime,
            self.config.thresholds,
        )
    }

    async fn decide(&self, output: PreprocessOutput, context: &GuardContext) -> Evaluation {
        if output.record.is_degraded() {
            debug!(
                request_id = %context.request_id,
                detected_type = %output.detected_format(),
                degradations = output.record.degradations.len(),
                preview = %output.preview(LOG_PREVIEW_CHARS),
                "Deciding on degraded extraction"
            );
        }
        let verdict = self
            .final_decision_with_context(output.text(), None, context)
            .await;
        Evaluation {
            verdict,
            report: output.report(),
        }
    }
}

/// Builder for Guard configuration
pub struct GuardBuilder {
    config: GuardConfig,
    classifier: Option<Arc<dyn Classifier>>,
    pipeline: Option<Pipeline>,
}

impl GuardBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            classifier: None,
            pipeline: None,
        }
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn shared_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Use a prepared pipeline (custom OCR engine, renderer, ...) instead of
    /// building one from `config.preprocess`.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Configure score bands
    pub fn thresholds(mut self, warn_at: u8, block_at: u8) -> Self {
        self.config = self.config.with_thresholds(warn_at, block_at);
        self
    }

    /// Configure audit logging
    pub fn audit(mut self, audit: crate::config::AuditConfig) -> Self {
        self.config.audit = audit;
        self
    }

    /// Build the Guard
    pub fn build(self) -> Result<Guard> {
        self.config.validate()?;
        let classifier = self
            .classifier
            .ok_or_else(|| GuardError::ConfigError("no classifier configured".to_string()))?;
        let pipeline = self
            .pipeline
            .unwrap_or_else(|| Pipeline::new(self.config.preprocess.clone()));

        Ok(Guard {
            audit_logger: AuditLogger::new(self.config.audit.clone()),
            classifier,
            pipeline: Arc::new(pipeline),
            config: self.config,
        })
    }
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}
