use serde::{Deserialize, Serialize};

/// A user correction for one package, learned across feedback submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub package_id: String,
    pub category: String,
    pub confidence: f64,
    pub feedback_count: u32,
    pub updated_at_ms: i64,
}
