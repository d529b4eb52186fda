//! Usage session records.
//!
//! A session is one contiguous span in one app under one category. While open
//! its `end_ms` trails the latest matching event; on close it is frozen.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
    /// Left open by a previous run that never delivered end-of-signal.
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
            SessionStatus::Interrupted => "interrupted",
        }
    }
}

/// Everything needed to insert a freshly opened session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub id: String,
    pub package_id: String,
    pub app_label: String,
    pub screen_text: String,
    pub category: String,
    pub subcategory: String,
    pub confidence: f64,
    pub start_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub package_id: String,
    pub app_label: String,
    pub screen_text: String,
    pub category: String,
    pub subcategory: String,
    pub confidence: f64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub status: SessionStatus,
}

impl Session {
    pub fn duration_ms(&self) -> i64 {
        (self.end_ms - self.start_ms).max(0)
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

impl From<NewSession> for Session {
    fn from(new: NewSession) -> Self {
        Self {
            id: new.id,
            package_id: new.package_id,
            app_label: new.app_label,
            screen_text: new.screen_text,
            category: new.category,
            subcategory: new.subcategory,
            confidence: new.confidence,
            start_ms: new.start_ms,
            end_ms: new.start_ms,
            status: SessionStatus::Open,
        }
    }
}

/// Total time spent in one category over a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUsage {
    pub category: String,
    pub duration_ms: i64,
    pub session_count: u32,
}
