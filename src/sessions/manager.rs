//! Session state machine.
//!
//! The manager decides and the [`SessionWriter`](super::SessionWriter) executes:
//! every input yields one [`SessionCommand`] and nothing here touches storage.
//! In-memory state is authoritative for the next decision even when a write
//! fails downstream.

use uuid::Uuid;

use crate::classification::app_label;
use crate::db::NewSession;
use crate::models::{ClassificationResult, Detection};
use crate::settings::SessionSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct CloseSession {
    pub session_id: String,
    pub end_ms: i64,
    /// Shorter than the minimum session length; the row is deleted after close.
    pub discard: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Open(NewSession),
    Extend { session_id: String, end_ms: i64 },
    CloseAndOpen { close: CloseSession, open: NewSession },
    Close(CloseSession),
    Ignore,
}

impl SessionCommand {
    pub fn is_ignore(&self) -> bool {
        matches!(self, SessionCommand::Ignore)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub id: String,
    pub package_id: String,
    pub category: String,
    pub start_ms: i64,
    pub last_event_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum ManagerState {
    #[default]
    Idle,
    Active(ActiveSession),
}

pub struct SessionManager {
    settings: SessionSettings,
    state: ManagerState,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl SessionManager {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            state: ManagerState::Idle,
        }
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            ManagerState::Active(active) => Some(active),
            ManagerState::Idle => None,
        }
    }

    /// Category of the open session; fed back to the classifier as context.
    pub fn current_category(&self) -> Option<&str> {
        self.active().map(|active| active.category.as_str())
    }

    pub fn handle(
        &mut self,
        detection: &Detection,
        classification: &ClassificationResult,
        now_ms: i64,
    ) -> SessionCommand {
        let ManagerState::Active(active) = &mut self.state else {
            let open = self.open_session(detection, classification, now_ms);
            return SessionCommand::Open(open);
        };

        let same_package = active.package_id == detection.package_id;
        let same_category = active.category == classification.category;

        if same_package && same_category {
            let end_ms = now_ms.max(active.last_event_ms);
            active.last_event_ms = end_ms;
            return SessionCommand::Extend {
                session_id: active.id.clone(),
                end_ms,
            };
        }

        // Within one app a category change must be confident to split the session.
        if same_package && classification.confidence <= self.settings.switch_confidence {
            return SessionCommand::Ignore;
        }

        let close = self.close_active(now_ms);
        let open_ms = close.as_ref().map_or(now_ms, |close| close.end_ms);
        let open = self.open_session(detection, classification, open_ms);
        match close {
            Some(close) => SessionCommand::CloseAndOpen { close, open },
            None => SessionCommand::Open(open),
        }
    }

    /// The observed stream ended; finalizes the open session, if any.
    pub fn end_of_signal(&mut self, now_ms: i64) -> SessionCommand {
        match self.close_active(now_ms) {
            Some(close) => SessionCommand::Close(close),
            None => SessionCommand::Ignore,
        }
    }

    fn close_active(&mut self, now_ms: i64) -> Option<CloseSession> {
        let ManagerState::Active(active) = std::mem::take(&mut self.state) else {
            return None;
        };
        // Never before the last extend already written for this session.
        let end_ms = now_ms.max(active.last_event_ms);
        Some(CloseSession {
            discard: end_ms.saturating_sub(active.start_ms) < self.settings.min_session_ms,
            session_id: active.id,
            end_ms,
        })
    }

    fn open_session(
        &mut self,
        detection: &Detection,
        classification: &ClassificationResult,
        now_ms: i64,
    ) -> NewSession {
        let session = NewSession {
            id: Uuid::new_v4().to_string(),
            package_id: detection.package_id.clone(),
            app_label: app_label(&detection.package_id),
            screen_text: detection.text.clone(),
            category: classification.category.clone(),
            subcategory: classification.subcategory.clone(),
            confidence: classification.confidence,
            start_ms: now_ms,
        };
        self.state = ManagerState::Active(ActiveSession {
            id: session.id.clone(),
            package_id: session.package_id.clone(),
            category: session.category.clone(),
            start_ms: now_ms,
            last_event_ms: now_ms,
        });
        session
    }
}
