//! Audit logging for Guard

use crate::config::AuditConfig;
use crate::types::{AuditEntry, Decision, GuardContext, Verdict};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use tracing::{info, warn};

/// Audit logger
#[derive(Debug, Clone)]
pub struct AuditLogger {
    config: AuditConfig,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Record a verdict. Returns the entry when auditing is enabled.
    pub fn log(
        &self,
        context: &GuardContext,
        content: &str,
        verdict: &Verdict,
        duration_ms: u64,
    ) -> Option<AuditEntry> {
        if !self.config.enabled {
            return None;
        }

        let entry = AuditEntry {
            context: context.clone(),
            content_hash: hash_content(content),
            decision: verdict.decision,
            threat_score: verdict.threat_score,
            reason: verdict.reason.clone(),
            processing_time_ms: duration_ms,
        };

        self.emit(&entry, content);
        Some(entry)
    }

    fn emit(&self, entry: &AuditEntry, content: &str) {
        let content_field = if self.config.log_content {
            Some(truncate(content, 500))
        } else {
            None
        };

        if entry.decision == Decision::Block {
            warn!(
                request_id = %entry.context.request_id,
                user_id = ?entry.context.user_id,
                threat_score = ?entry.threat_score,
                reason = %entry.reason,
                "Input blocked"
            );
        }

        info!(
            request_id = %entry.context.request_id,
            user_id = ?entry.context.user_id,
            session_id = ?entry.context.session_id,
            content_hash = %entry.content_hash,
            decision = %entry.decision,
            threat_score = ?entry.threat_score,
            processing_time_ms = entry.processing_time_ms,
            content = ?content_field,
            "Guard audit"
        );

        if let Some(ref path) = self.config.log_file {
            let written = serde_json::to_string(entry)
                .map_err(std::io::Error::from)
                .and_then(|json| {
                    std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                        .and_then(|mut f| writeln!(f, "{json}"))
                });
            if let Err(e) = written {
                warn!(path = %path.display(), error = %e, "Failed to append audit entry");
            }
        }
    }
}

/// Hash content for audit (privacy-preserving)
fn hash_content(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Truncate to at most `max_chars` characters for logging
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => format!("{}...", &s[..end]),
    }
}
