use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic tag naming the strategy that produced a classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationMethod {
    AdultVeto,
    PackageBased,
    UserLearned,
    WeightedKeywords,
    PackagePattern,
    ContextContinuation,
    ContextUnknown,
    Fallback,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::AdultVeto => "adult-veto",
            ClassificationMethod::PackageBased => "package-based",
            ClassificationMethod::UserLearned => "user-learned",
            ClassificationMethod::WeightedKeywords => "weighted-keywords",
            ClassificationMethod::PackagePattern => "package-pattern",
            ClassificationMethod::ContextContinuation => "context-continuation",
            ClassificationMethod::ContextUnknown => "context-unknown",
            ClassificationMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Lowercase canonical category, open vocabulary.
    pub category: String,
    pub subcategory: String,
    pub confidence: f64,
    pub method: ClassificationMethod,
}

impl ClassificationResult {
    pub fn new(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        confidence: f64,
        method: ClassificationMethod,
    ) -> Self {
        Self {
            category: category.into().to_lowercase(),
            subcategory: subcategory.into(),
            confidence: confidence.clamp(0.0, 1.0),
            method,
        }
    }
}
