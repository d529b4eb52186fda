pub mod classification;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod sensing;
pub mod sessions;
pub mod settings;
pub mod utils;

use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use classification::{CachedFeedbackStore, KeywordStore, PackageRuleTable};
use db::{Database, FeedbackStore, SessionStore};
use pipeline::{PipelineParts, UsagePipeline};
use sensing::{IntakeController, IntakeMessage};
use settings::SettingsStore;

pub use classification::ContentClassifier;
pub use error::{ConfigLoadError, SafetyStatus};
pub use models::{ClassificationResult, ScreenEvent};

const SETTINGS_ENV: &str = "USAGE_TIMELINE_SETTINGS";
const DEBUG_ENV: &str = "USAGE_TIMELINE_DEBUG";
const DEFAULT_DATA_DIR: &str = "usage-timeline";

/// Reads newline-delimited JSON intake messages from stdin until EOF or
/// Ctrl-C, persisting sessions into SQLite.
pub async fn run() -> Result<()> {
    let level = if env::var(DEBUG_ENV).is_ok_and(|value| value == "1") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // Initialize logging (RUST_LOG still applies per module)
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("usage-timeline starting up...");

    let settings_path = env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_DATA_DIR).join("settings.json"));
    let data_dir = settings_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let settings = SettingsStore::new(settings_path)?.pipeline();

    let db_path = settings
        .resources
        .database_path
        .clone()
        .unwrap_or_else(|| data_dir.join("usage-timeline.sqlite3"));
    let database = Database::new(db_path)?;

    // Sessions still open belong to a run that never delivered end-of-signal.
    let recovered = database.recover_open_sessions().await?;
    if !recovered.is_empty() {
        warn!(
            "Recovered {} open session(s) from a previous run; marked as interrupted",
            recovered.len()
        );
    }

    let keywords = Arc::new(KeywordStore::load_or_empty(
        settings.resources.keywords_path.as_deref(),
    ));
    if keywords.safety_status().is_degraded() {
        log::error!("Adult-content veto unavailable: no veto tokens loaded");
    }
    let rules = Arc::new(load_package_rules(
        settings.resources.package_rules_path.as_deref(),
    ));

    let preload = database.list_feedback().await.unwrap_or_else(|err| {
        warn!("Failed to preload feedback, starting without it: {err:?}");
        Vec::new()
    });
    let feedback: Arc<dyn FeedbackStore> = Arc::new(CachedFeedbackStore::new(
        Arc::new(database.clone()),
        preload,
    ));
    let sessions: Arc<dyn SessionStore> = Arc::new(database.clone());

    let pipeline = UsagePipeline::new(
        &settings,
        PipelineParts {
            keywords,
            rules,
            feedback,
            sessions,
        },
    )?;

    let mut controller = IntakeController::new();
    controller.start(pipeline)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<IntakeMessage>(line) {
                    Ok(message) => controller.send(message).await?,
                    Err(err) => warn!("Skipping malformed intake message: {err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; closing the open session");
                return controller.stop().await;
            }
        }
    }

    controller.finish().await
}

fn load_package_rules(path: Option<&Path>) -> PackageRuleTable {
    let table = PackageRuleTable::builtin();
    let Some(path) = path else {
        return table;
    };

    match table.clone().merge_path(path) {
        Ok(merged) => {
            info!("Loaded package rules from {} ({} total)", path.display(), merged.len());
            merged
        }
        Err(err) => {
            warn!("{err}; using built-in package rules only");
            table
        }
    }
}
