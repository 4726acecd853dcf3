//! Run metrics and audit events (§4.8 step 12).
//!
//! Persistence of audit events is explicitly out of scope (§1); they are
//! realized as a structured `tracing` event instead.

/// Per-webhook counters, accumulated across matching, staging, and flush.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub matched: u64,
    pub uploaded: u64,
    pub failed: u64,
    pub deprecated: u64,
    pub ignored_by_event_type: u64,
    pub files_skipped: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_matched(&mut self) {
        self.matched += 1;
    }

    pub fn record_skipped(&mut self) {
        self.files_skipped += 1;
    }

    pub fn record_uploaded(&mut self, n: u64) {
        self.uploaded += n;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn record_deprecated(&mut self, n: u64) {
        self.deprecated += n;
    }

    pub fn record_ignored(&mut self) {
        self.ignored_by_event_type += 1;
    }
}

/// The outcome an audit event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Processed,
    IgnoredEvent,
    OutOfScope,
    ConfigFailed,
    Cancelled,
}

/// A structured record of how one webhook's processing concluded.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub outcome: AuditOutcome,
    pub repo: String,
    pub pr_number: Option<u64>,
    pub metrics: RunMetrics,
}

impl AuditEvent {
    /// Logs this event at `info` for a clean outcome, `warn` otherwise.
    pub fn emit(&self) {
        match self.outcome {
            AuditOutcome::Processed => tracing::info!(
                outcome = ?self.outcome,
                repo = %self.repo,
                pr_number = ?self.pr_number,
                matched = self.metrics.matched,
                uploaded = self.metrics.uploaded,
                failed = self.metrics.failed,
                deprecated = self.metrics.deprecated,
                files_skipped = self.metrics.files_skipped,
                "webhook processed"
            ),
            AuditOutcome::IgnoredEvent => tracing::info!(
                outcome = ?self.outcome,
                repo = %self.repo,
                "webhook event ignored"
            ),
            _ => tracing::warn!(
                outcome = ?self.outcome,
                repo = %self.repo,
                pr_number = ?self.pr_number,
                failed = self.metrics.failed,
                "webhook processing did not complete normally"
            ),
        }
    }
}
