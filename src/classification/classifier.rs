use std::sync::Arc;

use crate::db::FeedbackStore;
use crate::error::SafetyStatus;
use crate::models::ClassificationResult;

use super::keywords::KeywordStore;
use super::package_rules::PackageRuleTable;
use super::strategies::{
    absolute_fallback, AbsoluteFallbackStrategy, AdultVetoStrategy, ClassificationInput,
    ClassificationStrategy, ContextualFallbackStrategy, LearnedFeedbackStrategy,
    PackageRuleStrategy, WeightedKeywordStrategy,
};

/// Assigns a category to a screen by running an ordered strategy cascade.
///
/// The order is the priority: the adult veto first, then package rules, learned
/// feedback, keyword scoring and the contextual fallbacks. Classification only
/// reads its tables and the feedback store; it never writes.
pub struct ContentClassifier {
    strategies: Vec<Box<dyn ClassificationStrategy>>,
    safety: SafetyStatus,
}

impl ContentClassifier {
    pub fn new(
        keywords: Arc<KeywordStore>,
        rules: Arc<PackageRuleTable>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        let safety = keywords.safety_status();
        let strategies: Vec<Box<dyn ClassificationStrategy>> = vec![
            Box::new(AdultVetoStrategy::new(keywords.clone())),
            Box::new(PackageRuleStrategy::new(rules)),
            Box::new(LearnedFeedbackStrategy::new(feedback)),
            Box::new(WeightedKeywordStrategy::new(keywords)),
            Box::new(ContextualFallbackStrategy),
            Box::new(AbsoluteFallbackStrategy),
        ];
        Self { strategies, safety }
    }

    /// Builds a classifier around a custom cascade.
    pub fn with_strategies(
        strategies: Vec<Box<dyn ClassificationStrategy>>,
        safety: SafetyStatus,
    ) -> Self {
        Self { strategies, safety }
    }

    pub fn classify(
        &self,
        screen_text: &str,
        package_id: &str,
        previous_category: Option<&str>,
    ) -> ClassificationResult {
        let input = ClassificationInput::new(screen_text, package_id, previous_category);
        self.strategies
            .iter()
            .find_map(|strategy| strategy.try_classify(&input))
            .unwrap_or_else(absolute_fallback)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn safety_status(&self) -> SafetyStatus {
        self.safety
    }
}
