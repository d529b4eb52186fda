//! One observed screen stream, end to end:
//! content type → stability → classification → session decision → writer.

use std::sync::Arc;

use anyhow::Result;

use crate::classification::{
    record_user_feedback, ContentClassifier, KeywordStore, PackageRuleTable,
};
use crate::db::{FeedbackRecord, FeedbackStore, SessionStore};
use crate::error::SafetyStatus;
use crate::models::{Detection, ScreenEvent};
use crate::sensing::{detect_content_type, StabilityFilter};
use crate::sessions::{ActiveSession, SessionCommand, SessionManager, SessionWriter};
use crate::settings::PipelineSettings;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Shared tables and stores a pipeline is assembled from.
pub struct PipelineParts {
    pub keywords: Arc<KeywordStore>,
    pub rules: Arc<PackageRuleTable>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub sessions: Arc<dyn SessionStore>,
}

pub struct UsagePipeline {
    filter: StabilityFilter,
    classifier: ContentClassifier,
    manager: SessionManager,
    writer: SessionWriter,
    feedback: Arc<dyn FeedbackStore>,
    last_event_ms: Option<i64>,
}

impl UsagePipeline {
    pub fn new(settings: &PipelineSettings, parts: PipelineParts) -> Result<Self> {
        let classifier =
            ContentClassifier::new(parts.keywords, parts.rules, parts.feedback.clone());
        Ok(Self {
            filter: StabilityFilter::new(settings.stability.clone()),
            classifier,
            manager: SessionManager::new(settings.sessions.clone()),
            writer: SessionWriter::spawn(parts.sessions)?,
            feedback: parts.feedback,
            last_event_ms: None,
        })
    }

    /// Runs one raw event through the pipeline and returns the command handed
    /// to the writer. Events that do not produce a stable detection yield
    /// `Ignore`.
    pub fn process(&mut self, event: &ScreenEvent) -> SessionCommand {
        let now_ms = event.timestamp_ms;
        let content_type = detect_content_type(&event.package_id, &event.text, &event.node_classes);

        let Some(stable) = self
            .filter
            .evaluate(&event.package_id, content_type, event.kind, now_ms)
        else {
            return SessionCommand::Ignore;
        };
        self.last_event_ms = Some(self.last_event_ms.map_or(now_ms, |last| last.max(now_ms)));

        let detection = Detection::from_stable(stable, &event.text);
        let classification = self.classifier.classify(
            &detection.text,
            &detection.package_id,
            self.manager.current_category(),
        );
        log_debug!(
            "{} [{}] -> {} ({:.2}, {})",
            detection.package_id,
            detection.content_type,
            classification.category,
            classification.confidence,
            classification.method
        );

        let command = self.manager.handle(&detection, &classification, now_ms);
        self.writer.submit(command.clone());
        command
    }

    /// The observed stream went away: finalizes the open session.
    pub fn end_of_signal(&mut self, now_ms: i64) -> SessionCommand {
        let command = self.manager.end_of_signal(now_ms);
        self.filter.reset();
        self.writer.submit(command.clone());
        command
    }

    /// Blocks on the feedback store's write-through; keep off async workers.
    pub fn record_feedback(
        &self,
        package_id: &str,
        category: &str,
        now_ms: i64,
    ) -> Result<FeedbackRecord> {
        record_user_feedback(self.feedback.as_ref(), package_id, category, now_ms)
    }

    pub fn feedback_store(&self) -> Arc<dyn FeedbackStore> {
        self.feedback.clone()
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.manager.active()
    }

    /// Latest timestamp that produced a stable detection.
    pub fn last_event_ms(&self) -> Option<i64> {
        self.last_event_ms
    }

    pub fn safety_status(&self) -> SafetyStatus {
        self.classifier.safety_status()
    }

    pub fn failed_writes(&self) -> u64 {
        self.writer.failed_writes()
    }

    /// Waits until every command issued so far has reached the store.
    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    /// Closes the open session at `now_ms`, then drains and stops the writer.
    pub fn shutdown(&mut self, now_ms: i64) {
        self.end_of_signal(now_ms);
        self.writer.shutdown();
    }
}
