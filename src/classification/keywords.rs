//! Category keyword tables and the adult-content veto list.
//!
//! Loaded once at startup and shared read-only. Every keyword and veto token is
//! stored lowercased; callers match against lowercased screen text.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::{ConfigLoadError, SafetyStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const BUILTIN_KEYWORDS: &str = include_str!("resources/keywords.json");
const DEFAULT_KEYWORD_WEIGHT: f64 = 1.0;

#[derive(Debug, Deserialize)]
struct KeywordPayload {
    #[serde(default)]
    adult_veto: Vec<String>,
    /// category -> keyword -> explicit weight
    #[serde(default)]
    weighted: BTreeMap<String, BTreeMap<String, f64>>,
    /// category -> language -> keywords
    #[serde(flatten)]
    categories: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordStore {
    /// BTreeMap so scoring walks categories in name order.
    categories: BTreeMap<String, BTreeMap<String, f64>>,
    adult_veto: Vec<String>,
}

impl KeywordStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table compiled into the binary.
    pub fn builtin() -> Self {
        match Self::from_json_str(BUILTIN_KEYWORDS, "builtin keywords") {
            Ok(store) => store,
            Err(err) => {
                log_error!("builtin keyword table is unusable: {err}");
                Self::empty()
            }
        }
    }

    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, ConfigLoadError> {
        let payload: KeywordPayload =
            serde_json::from_str(json).map_err(|source| ConfigLoadError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        Self::from_payload(payload)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_json_str(&contents, &path.display().to_string())
    }

    /// Loads `path` when given, the builtin table otherwise. A resource that
    /// cannot be loaded yields an empty store: classification degrades to
    /// package rules and fallbacks, and the veto stops firing.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };

        match Self::load_from_path(path) {
            Ok(store) => {
                log_info!(
                    "Loaded {} keyword categories and {} veto tokens from {}",
                    store.category_count(),
                    store.veto_token_count(),
                    path.display()
                );
                store
            }
            Err(err) => {
                log_error!("{err}; keyword classification disabled");
                Self::empty()
            }
        }
    }

    fn from_payload(payload: KeywordPayload) -> Result<Self, ConfigLoadError> {
        let mut categories: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

        for (category, languages) in payload.categories {
            let table = categories.entry(normalize(&category)).or_default();
            for keyword in languages.into_values().flatten() {
                let keyword = normalize(&keyword);
                if !keyword.is_empty() {
                    table.entry(keyword).or_insert(DEFAULT_KEYWORD_WEIGHT);
                }
            }
        }

        for (category, weights) in payload.weighted {
            let category = normalize(&category);
            for (keyword, weight) in weights {
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(ConfigLoadError::InvalidWeight {
                        category,
                        keyword,
                        weight,
                    });
                }
                let keyword = normalize(&keyword);
                if !keyword.is_empty() {
                    categories
                        .entry(category.clone())
                        .or_default()
                        .insert(keyword, weight);
                }
            }
        }

        categories.retain(|_, table| !table.is_empty());

        let mut adult_veto: Vec<String> = payload
            .adult_veto
            .iter()
            .map(|token| normalize(token))
            .filter(|token| !token.is_empty())
            .collect();
        adult_veto.sort();
        adult_veto.dedup();

        Ok(Self {
            categories,
            adult_veto,
        })
    }

    pub fn safety_status(&self) -> SafetyStatus {
        if self.adult_veto.is_empty() {
            SafetyStatus::VetoUnavailable
        } else {
            SafetyStatus::Protected
        }
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn veto_token_count(&self) -> usize {
        self.adult_veto.len()
    }

    pub fn keyword_weight(&self, category: &str, keyword: &str) -> Option<f64> {
        self.categories.get(category)?.get(keyword).copied()
    }

    /// First veto token present in `lowered`, if any.
    pub fn find_veto_token(&self, lowered: &str) -> Option<&str> {
        self.adult_veto
            .iter()
            .find(|token| contains_token(lowered, token))
            .map(String::as_str)
    }

    /// Total substring occurrences of all veto tokens.
    pub fn veto_occurrences(&self, lowered: &str) -> usize {
        self.adult_veto
            .iter()
            .map(|token| count_occurrences(lowered, token))
            .sum()
    }

    /// Weighted keyword score per category, categories in name order.
    /// Categories without a single hit are left out.
    pub fn score_categories(&self, lowered: &str) -> BTreeMap<String, f64> {
        self.categories
            .iter()
            .filter_map(|(category, keywords)| {
                let score: f64 = keywords
                    .iter()
                    .map(|(keyword, weight)| count_occurrences(lowered, keyword) as f64 * weight)
                    .sum();
                (score > 0.0).then(|| (category.clone(), score))
            })
            .collect()
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Non-overlapping substring occurrences.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Whole-word match for purely alphanumeric tokens, substring match otherwise.
pub fn contains_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    if token.chars().all(char::is_alphanumeric) {
        contains_whole_word(haystack, token)
    } else {
        haystack.contains(token)
    }
}

fn contains_whole_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "adult_veto": ["OnlyFans", "18+ only", "  "],
        "games": { "en": ["Level", "score"], "es": ["nivel", "level"] },
        "shopping": { "en": ["price"] },
        "weighted": { "shopping": { "add to cart": 3.0, "price": 2.0 } }
    }"#;

    #[test]
    fn parses_languages_and_weights() {
        let store = KeywordStore::from_json_str(SAMPLE, "sample").unwrap();

        assert_eq!(store.category_count(), 2);
        assert_eq!(store.keyword_weight("games", "level"), Some(1.0));
        assert_eq!(store.keyword_weight("games", "nivel"), Some(1.0));
        assert_eq!(store.keyword_weight("shopping", "price"), Some(2.0));
        assert_eq!(store.keyword_weight("shopping", "add to cart"), Some(3.0));
        assert_eq!(store.veto_token_count(), 2);
        assert_eq!(store.safety_status(), SafetyStatus::Protected);
    }

    #[test]
    fn rejects_non_positive_weight() {
        let json = r#"{ "weighted": { "games": { "level": -1.0 } } }"#;
        let err = KeywordStore::from_json_str(json, "bad").unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidWeight { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = KeywordStore::from_json_str("{ nope", "broken").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }

    #[test]
    fn missing_file_degrades_to_empty_store() {
        let store = KeywordStore::load_or_empty(Some(Path::new("/nonexistent/keywords.json")));
        assert_eq!(store.category_count(), 0);
        assert_eq!(store.safety_status(), SafetyStatus::VetoUnavailable);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = KeywordStore::load_or_empty(Some(file.path()));
        assert_eq!(store.category_count(), 2);
    }

    #[test]
    fn builtin_table_carries_a_veto_list() {
        let store = KeywordStore::builtin();
        assert!(store.category_count() >= 5);
        assert_eq!(store.safety_status(), SafetyStatus::Protected);
        assert!(store.find_veto_token("new onlyfans post").is_some());
    }

    #[test]
    fn alphanumeric_tokens_need_word_boundaries() {
        assert!(contains_token("watch xxx now", "xxx"));
        assert!(contains_token("xxx", "xxx"));
        assert!(!contains_token("taxxxi", "xxx"));
        assert!(contains_token("(porn)", "porn"));
        assert!(!contains_token("pornography", "porn"));
    }

    #[test]
    fn symbol_tokens_match_as_substrings() {
        assert!(contains_token("content 18+ only!", "18+ only"));
        assert!(contains_token("free-sex-cam-site", "sex-cam"));
    }

    #[test]
    fn occurrences_do_not_overlap() {
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("price price", "price"), 2);
        assert_eq!(count_occurrences("anything", ""), 0);
    }

    #[test]
    fn scores_skip_categories_without_hits() {
        let store = KeywordStore::from_json_str(SAMPLE, "sample").unwrap();
        let scores = store.score_categories("price drop: add to cart, price 3");

        assert_eq!(scores.get("shopping"), Some(&7.0));
        assert!(!scores.contains_key("games"));
    }
}
