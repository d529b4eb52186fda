//! Package identity: known package → category rules, package-name patterns
//! and display labels.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::error::ConfigLoadError;

const BUILTIN_RULES: &[(&str, &str)] = &[
    ("com.whatsapp", "social"),
    ("com.instagram.android", "social"),
    ("com.facebook.katana", "social"),
    ("com.facebook.orca", "social"),
    ("com.snapchat.android", "social"),
    ("com.twitter.android", "social"),
    ("org.telegram.messenger", "social"),
    ("com.reddit.frontpage", "social"),
    ("com.linkedin.android", "social"),
    ("com.google.android.youtube", "entertainment"),
    ("com.netflix.mediaclient", "entertainment"),
    ("com.zhiliaoapp.musically", "entertainment"),
    ("com.spotify.music", "entertainment"),
    ("tv.twitch.android.app", "entertainment"),
    ("com.amazon.avod.thirdpartyclient", "entertainment"),
    ("com.supercell.clashofclans", "games"),
    ("com.king.candycrushsaga", "games"),
    ("com.mojang.minecraftpe", "games"),
    ("com.amazon.mShop.android.shopping", "shopping"),
    ("com.flipkart.android", "shopping"),
    ("com.ebay.mobile", "shopping"),
    ("com.duolingo", "education"),
    ("org.khanacademy.android", "education"),
    ("com.google.android.gm", "productivity"),
    ("com.google.android.calendar", "productivity"),
    ("com.microsoft.office.outlook", "productivity"),
    ("com.google.android.apps.docs", "productivity"),
    ("com.nytimes.android", "news"),
    ("bbc.mobile.news.ww", "news"),
    ("com.google.android.apps.magazines", "news"),
];

/// Substrings of a package id that hint at its category, checked in order.
const PACKAGE_PATTERNS: &[(&str, &str)] = &[
    ("game", "games"),
    ("social", "social"),
    ("news", "news"),
    ("music", "entertainment"),
    ("video", "entertainment"),
    ("shop", "shopping"),
    ("learn", "education"),
];

const KNOWN_LABELS: &[(&str, &str)] = &[
    ("com.whatsapp", "WhatsApp"),
    ("com.google.android.youtube", "YouTube"),
    ("com.zhiliaoapp.musically", "TikTok"),
    ("com.facebook.katana", "Facebook"),
    ("com.facebook.orca", "Messenger"),
    ("com.twitter.android", "X"),
    ("com.reddit.frontpage", "Reddit"),
    ("com.linkedin.android", "LinkedIn"),
    ("com.google.android.gm", "Gmail"),
    ("com.amazon.mShop.android.shopping", "Amazon"),
    ("com.android.chrome", "Chrome"),
];

/// Segments that never name the app itself.
const GENERIC_SEGMENTS: &[&str] = &[
    "com", "org", "net", "io", "co", "tv", "android", "app", "apps", "mobile", "client",
    "mediaclient", "frontpage", "katana", "free", "lite",
];

#[derive(Debug, Clone, Default)]
pub struct PackageRuleTable {
    rules: HashMap<String, String>,
}

impl PackageRuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN_RULES
                .iter()
                .map(|(package, category)| (package.to_string(), category.to_string()))
                .collect(),
        }
    }

    /// Overlays `{ "<package>": "<category>" }` JSON on this table.
    pub fn merge_json_str(mut self, json: &str, origin: &str) -> Result<Self, ConfigLoadError> {
        let extra: HashMap<String, String> =
            serde_json::from_str(json).map_err(|source| ConfigLoadError::Parse {
                origin: origin.to_string(),
                source,
            })?;

        for (package, category) in extra {
            let package = package.trim().to_string();
            let category = category.trim().to_lowercase();
            if !package.is_empty() && !category.is_empty() {
                self.rules.insert(package, category);
            }
        }
        Ok(self)
    }

    pub fn merge_path(self, path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        self.merge_json_str(&contents, &path.display().to_string())
    }

    pub fn lookup(&self, package_id: &str) -> Option<&str> {
        self.rules.get(package_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Category implied by a pattern in the package id, e.g. `com.acme.gamehub` → games.
pub fn pattern_category(package_id: &str) -> Option<&'static str> {
    let lowered = package_id.to_lowercase();
    PACKAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, category)| *category)
}

/// Human-readable app name for a package id.
pub fn app_label(package_id: &str) -> String {
    if let Some((_, label)) = KNOWN_LABELS.iter().find(|(pkg, _)| *pkg == package_id) {
        return label.to_string();
    }

    package_id
        .rsplit('.')
        .find(|segment| {
            !segment.is_empty() && !GENERIC_SEGMENTS.contains(&segment.to_lowercase().as_str())
        })
        .map(capitalize)
        .unwrap_or_else(|| package_id.to_string())
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
