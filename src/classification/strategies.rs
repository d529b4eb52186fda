//! The individual classification strategies.
//!
//! Each strategy either claims a classification or passes. The classifier runs
//! them in a fixed order and the first claim wins; strategies never blend.

use std::sync::Arc;

use crate::db::FeedbackStore;
use crate::models::{ClassificationMethod, ClassificationResult};

use super::keywords::KeywordStore;
use super::package_rules::{pattern_category, PackageRuleTable};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const ADULT_CATEGORY: &str = "adult";
pub const OTHER_CATEGORY: &str = "other";

const VETO_CONFIDENCE: f64 = 0.98;
const PACKAGE_RULE_CONFIDENCE: f64 = 0.95;
const LEARNED_MIN_CONFIDENCE: f64 = 0.8;
const LEARNED_DECAY: f64 = 0.9;
const VETO_TOKEN_WEIGHT: f64 = 5.0;
const KEYWORD_SCORE_THRESHOLD: f64 = 3.0;
const KEYWORD_SCORE_SCALE: f64 = 10.0;
const KEYWORD_MAX_CONFIDENCE: f64 = 0.85;
const PATTERN_CONFIDENCE: f64 = 0.7;
const CONTINUATION_CONFIDENCE: f64 = 0.5;
/// Shorter text reads as a transient screen that belongs to the previous context.
const CONTINUATION_MAX_CHARS: usize = 50;
const UNKNOWN_CONFIDENCE: f64 = 0.2;
const FALLBACK_CONFIDENCE: f64 = 0.3;

/// What every strategy sees. `lowered` is computed once per classification.
#[derive(Debug)]
pub struct ClassificationInput<'a> {
    pub text: &'a str,
    pub lowered: String,
    pub package_id: &'a str,
    pub previous_category: Option<&'a str>,
}

impl<'a> ClassificationInput<'a> {
    pub fn new(text: &'a str, package_id: &'a str, previous_category: Option<&'a str>) -> Self {
        Self {
            text,
            lowered: text.to_lowercase(),
            package_id,
            previous_category: previous_category.filter(|c| !c.is_empty()),
        }
    }
}

pub trait ClassificationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_classify(&self, input: &ClassificationInput<'_>) -> Option<ClassificationResult>;
}

/// Forces `adult` whenever a veto token is on screen.
pub struct AdultVetoStrategy {
    keywords: Arc<KeywordStore>,
}

impl AdultVetoStrategy {
    pub fn new(keywords: Arc<KeywordStore>) -> Self {
        Self { keywords }
    }
}

impl ClassificationStrategy for AdultVetoStrategy {
    fn name(&self) -> &'static str {
        "adult-veto"
    }

    fn try_classify(&self, input: &ClassificationInput<'_>) -> Option<ClassificationResult> {
        self.keywords.find_veto_token(&input.lowered)?;
        Some(ClassificationResult::new(
            ADULT_CATEGORY,
            adult_subcategory(&input.lowered),
            VETO_CONFIDENCE,
            ClassificationMethod::AdultVeto,
        ))
    }
}

pub struct PackageRuleStrategy {
    rules: Arc<PackageRuleTable>,
}

impl PackageRuleStrategy {
    pub fn new(rules: Arc<PackageRuleTable>) -> Self {
        Self { rules }
    }
}

impl ClassificationStrategy for PackageRuleStrategy {
    fn name(&self) -> &'static str {
        "package-rule"
    }

    fn try_classify(&self, input: &ClassificationInput<'_>) -> Option<ClassificationResult> {
        let category = self.rules.lookup(input.package_id)?;
        Some(ClassificationResult::new(
            category,
            derive_subcategory(category, &input.lowered),
            PACKAGE_RULE_CONFIDENCE,
            ClassificationMethod::PackageBased,
        ))
    }
}

/// Replays a user's earlier correction for this package, slightly decayed.
pub struct LearnedFeedbackStrategy {
    feedback: Arc<dyn FeedbackStore>,
}

impl LearnedFeedbackStrategy {
    pub fn new(feedback: Arc<dyn FeedbackStore>) -> Self {
        Self { feedback }
    }
}

impl ClassificationStrategy for LearnedFeedbackStrategy {
    fn name(&self) -> &'static str {
        "learned-feedback"
    }

    fn try_classify(&self, input: &ClassificationInput<'_>) -> Option<ClassificationResult> {
        let record = match self.feedback.get(input.package_id) {
            Ok(record) => record?,
            Err(err) => {
                log_warn!("feedback lookup failed for {}: {err:#}", input.package_id);
                return None;
            }
        };

        if record.confidence <= LEARNED_MIN_CONFIDENCE {
            return None;
        }

        let category = record.category.to_lowercase();
        Some(ClassificationResult::new(
            category.as_str(),
            derive_subcategory(&category, &input.lowered),
            record.confidence * LEARNED_DECAY,
            ClassificationMethod::UserLearned,
        ))
    }
}

/// Scores every category by weighted keyword hits. Veto tokens also score for
/// `adult` here, so a variant the veto missed can still win on points.
pub struct WeightedKeywordStrategy {
    keywords: Arc<KeywordStore>,
}

impl WeightedKeywordStrategy {
    pub fn new(keywords: Arc<KeywordStore>) -> Self {
        Self { keywords }
    }
}

impl ClassificationStrategy for WeightedKeywordStrategy {
    fn name(&self) -> &'static str {
        "weighted-keywords"
    }

    fn try_classify(&self, input: &ClassificationInput<'_>) -> Option<ClassificationResult> {
        let mut scores = self.keywords.score_categories(&input.lowered);

        let adult_score = self.keywords.veto_occurrences(&input.lowered) as f64 * VETO_TOKEN_WEIGHT;
        if adult_score > 0.0 {
            let entry = scores.entry(ADULT_CATEGORY.to_string()).or_insert(0.0);
            *entry = entry.max(adult_score);
        }

        // Strictly greater: on a tie the category that sorts first keeps the lead.
        let mut best: Option<(&str, f64)> = None;
        for (category, score) in &scores {
            if best.map_or(true, |(_, top)| *score > top) {
                best = Some((category.as_str(), *score));
            }
        }

        let (category, score) = best?;
        if score <= KEYWORD_SCORE_THRESHOLD {
            return None;
        }

        let subcategory = if category == ADULT_CATEGORY {
            adult_subcategory(&input.lowered)
        } else {
            derive_subcategory(category, &input.lowered)
        };

        Some(ClassificationResult::new(
            category,
            subcategory,
            (score / KEYWORD_SCORE_SCALE).min(KEYWORD_MAX_CONFIDENCE),
            ClassificationMethod::WeightedKeywords,
        ))
    }
}

/// Package-name patterns, then continuation of the previous category on short
/// transient screens, then an explicit low-confidence `other`.
pub struct ContextualFallbackStrategy;

impl ClassificationStrategy for ContextualFallbackStrategy {
    fn name(&self) -> &'static str {
        "contextual-fallback"
    }

    fn try_classify(&self, input: &ClassificationInput<'_>) -> Option<ClassificationResult> {
        if let Some(category) = pattern_category(input.package_id) {
            return Some(ClassificationResult::new(
                category,
                derive_subcategory(category, &input.lowered),
                PATTERN_CONFIDENCE,
                ClassificationMethod::PackagePattern,
            ));
        }

        if let Some(previous) = input.previous_category {
            if input.text.chars().count() < CONTINUATION_MAX_CHARS {
                return Some(ClassificationResult::new(
                    previous,
                    "",
                    CONTINUATION_CONFIDENCE,
                    ClassificationMethod::ContextContinuation,
                ));
            }
        }

        Some(ClassificationResult::new(
            OTHER_CATEGORY,
            "",
            UNKNOWN_CONFIDENCE,
            ClassificationMethod::ContextUnknown,
        ))
    }
}

pub struct AbsoluteFallbackStrategy;

impl ClassificationStrategy for AbsoluteFallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn try_classify(&self, _input: &ClassificationInput<'_>) -> Option<ClassificationResult> {
        Some(absolute_fallback())
    }
}

pub fn absolute_fallback() -> ClassificationResult {
    ClassificationResult::new(
        OTHER_CATEGORY,
        "",
        FALLBACK_CONFIDENCE,
        ClassificationMethod::Fallback,
    )
}

type Hints = &'static [(&'static [&'static str], &'static str)];

const ADULT_HINTS: Hints = &[
    (&["webcam", "live cam", "cams", "camgirl"], "webcam"),
    (&["video", "clip"], "videos"),
    (&["photo", "pics", "gallery"], "photos"),
];
const SOCIAL_HINTS: Hints = &[
    (&["chat", "message", "typing"], "messaging"),
    (&["reel", "story", "stories"], "stories"),
    (&["post", "feed", "like"], "feed"),
];
const ENTERTAINMENT_HINTS: Hints = &[
    (&["music", "song", "playlist", "album"], "music"),
    (&["episode", "series", "movie", "season"], "streaming"),
    (&["video", "watch", "reel", "clip"], "video"),
];
const GAMES_HINTS: Hints = &[
    (&["coins", "gems", "purchase", "shop"], "in_game_store"),
    (&["level", "score", "battle", "quest"], "gameplay"),
];
const NEWS_HINTS: Hints = &[
    (&["breaking"], "breaking"),
    (&["opinion", "editorial"], "opinion"),
];
const SHOPPING_HINTS: Hints = &[
    (&["cart", "checkout", "buy now"], "checkout"),
    (&["deal", "sale", "offer", "discount"], "deals"),
];
const EDUCATION_HINTS: Hints = &[
    (&["quiz", "exercise", "practice"], "practice"),
    (&["lesson", "course", "lecture"], "course"),
];
const PRODUCTIVITY_HINTS: Hints = &[
    (&["inbox", "email", "mail"], "email"),
    (&["calendar", "meeting"], "calendar"),
    (&["document", "spreadsheet", "notes"], "documents"),
];

fn first_hint(lowered: &str, hints: Hints) -> Option<&'static str> {
    hints
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(_, label)| *label)
}

pub fn adult_subcategory(lowered: &str) -> &'static str {
    first_hint(lowered, ADULT_HINTS).unwrap_or("general_adult")
}

/// Refines a category from screen text. Unknown categories get no subcategory.
pub fn derive_subcategory(category: &str, lowered: &str) -> &'static str {
    let (hints, fallback) = match category {
        "social" => (SOCIAL_HINTS, "general"),
        "entertainment" => (ENTERTAINMENT_HINTS, "general"),
        "games" => (GAMES_HINTS, "general"),
        "news" => (NEWS_HINTS, "general"),
        "shopping" => (SHOPPING_HINTS, "browsing"),
        "education" => (EDUCATION_HINTS, "general"),
        "productivity" => (PRODUCTIVITY_HINTS, "general"),
        _ => return "",
    };
    first_hint(lowered, hints).unwrap_or(fallback)
}
