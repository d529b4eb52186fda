use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StabilitySettings {
    /// Non-important events closer together than this are not evaluated.
    pub cooldown_ms: i64,
    /// Consecutive identical observations needed before a detection is stable.
    pub required_stable: u32,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            cooldown_ms: 3_000,
            required_stable: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Sessions shorter than this are deleted when closed.
    pub min_session_ms: i64,
    /// A category change within the same app must beat this confidence to split.
    pub switch_confidence: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_session_ms: 500,
            switch_confidence: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResourceSettings {
    /// Keyword/veto payload; the embedded table is used when unset.
    pub keywords_path: Option<PathBuf>,
    /// Extra package rules merged over the built-in table.
    pub package_rules_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub stability: StabilitySettings,
    pub sessions: SessionSettings,
    pub resources: ResourceSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PipelineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings at {}: {err}; using defaults",
                    path.display()
                );
                PipelineSettings::default()
            })
        } else {
            PipelineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn pipeline(&self) -> PipelineSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_pipeline(&self, settings: PipelineSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &PipelineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("settings.json")).unwrap();
        let settings = store.pipeline();

        assert_eq!(settings.stability.cooldown_ms, 3_000);
        assert_eq!(settings.stability.required_stable, 2);
        assert_eq!(settings.sessions.min_session_ms, 500);
        assert_eq!(settings.sessions.switch_confidence, 0.7);
        assert!(settings.resources.keywords_path.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{ "sessions": { "min_session_ms": 1000 } }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().pipeline();
        assert_eq!(settings.sessions.min_session_ms, 1000);
        assert_eq!(settings.sessions.switch_confidence, 0.7);
        assert_eq!(settings.stability.cooldown_ms, 3_000);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let settings = SettingsStore::new(path).unwrap().pipeline();
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn update_persists_to_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.pipeline();
        settings.stability.required_stable = 3;
        store.update_pipeline(settings).unwrap();

        let reloaded = SettingsStore::new(path).unwrap().pipeline();
        assert_eq!(reloaded.stability.required_stable, 3);
    }
}
