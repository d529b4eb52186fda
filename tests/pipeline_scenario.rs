use std::sync::Arc;

use tempfile::TempDir;
use usage_timeline_lib::classification::{KeywordStore, PackageRuleTable};
use usage_timeline_lib::db::{
    Database, MemoryFeedbackStore, MemorySessionStore, SessionStatus, SessionStore,
};
use usage_timeline_lib::models::{EventKind, ScreenEvent};
use usage_timeline_lib::pipeline::{PipelineParts, UsagePipeline};
use usage_timeline_lib::sessions::SessionCommand;
use usage_timeline_lib::settings::PipelineSettings;

fn build(sessions: Arc<dyn SessionStore>) -> UsagePipeline {
    UsagePipeline::new(
        &PipelineSettings::default(),
        PipelineParts {
            keywords: Arc::new(KeywordStore::builtin()),
            rules: Arc::new(PackageRuleTable::builtin()),
            feedback: Arc::new(MemoryFeedbackStore::new()),
            sessions,
        },
    )
    .unwrap()
}

fn window(package_id: &str, timestamp_ms: i64, text: &str) -> ScreenEvent {
    ScreenEvent::new(package_id, timestamp_ms, text, EventKind::WindowStateChanged)
}

#[test]
fn instagram_then_whatsapp() {
    let store = Arc::new(MemorySessionStore::new());
    let mut pipeline = build(store.clone());

    let first = window("com.instagram.android", 0, "reel video");
    assert!(pipeline.process(&first).is_ignore());
    let s1 = match pipeline.process(&first) {
        SessionCommand::Open(open) => open,
        other => panic!("expected Open, got {other:?}"),
    };
    assert_eq!(s1.category, "social");
    assert_eq!(s1.app_label, "Instagram");

    let chat = window("com.whatsapp", 5_000, "chat message");
    assert!(pipeline.process(&chat).is_ignore());
    let s2 = match pipeline.process(&chat) {
        SessionCommand::CloseAndOpen { close, open } => {
            assert_eq!(close.session_id, s1.id);
            assert_eq!(close.end_ms, 5_000);
            assert!(!close.discard);
            open
        }
        other => panic!("expected CloseAndOpen, got {other:?}"),
    };
    pipeline.flush().unwrap();

    let closed = store.session(&s1.id).unwrap();
    assert_eq!(closed.status, SessionStatus::Closed);
    assert_eq!(closed.duration_ms(), 5_000);

    let opened = store.session(&s2.id).unwrap();
    assert!(opened.is_open());
    assert_eq!(opened.package_id, "com.whatsapp");
    assert_eq!(opened.category, "social");
    assert_eq!(opened.start_ms, 5_000);
}

#[test]
fn quick_app_hop_leaves_no_row_behind() {
    let store = Arc::new(MemorySessionStore::new());
    let mut pipeline = build(store.clone());

    for ts in [0, 100] {
        pipeline.process(&window("com.whatsapp", ts, "chat"));
    }
    for ts in [400, 500] {
        pipeline.process(&window("com.google.android.youtube", ts, "video"));
    }
    pipeline.shutdown(10_000);

    let rows = store.sessions();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].package_id, "com.google.android.youtube");
    assert_eq!(rows[0].category, "entertainment");
    assert_eq!(rows[0].start_ms, 500);
    assert_eq!(rows[0].end_ms, 10_000);
}

#[test]
fn store_failures_do_not_stop_the_pipeline() {
    let store = Arc::new(MemorySessionStore::new());
    let mut pipeline = build(store.clone());

    store.set_failing(true);
    pipeline.process(&window("com.whatsapp", 0, "chat"));
    pipeline.process(&window("com.whatsapp", 10, "chat"));
    pipeline.flush().unwrap();
    assert_eq!(pipeline.failed_writes(), 1);
    assert_eq!(
        pipeline.active_session().map(|s| s.category.as_str()),
        Some("social")
    );

    store.set_failing(false);
    pipeline.process(&window("com.google.android.youtube", 5_000, "video"));
    pipeline.process(&window("com.google.android.youtube", 5_010, "video"));
    pipeline.flush().unwrap();

    let rows = store.sessions();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].package_id, "com.google.android.youtube");
}

#[tokio::test]
async fn sessions_land_in_sqlite() {
    let temp = TempDir::new().unwrap();
    let database = Database::new(temp.path().join("timeline.sqlite3")).unwrap();
    let mut pipeline = build(Arc::new(database.clone()));

    for ts in [0, 10, 60_000] {
        pipeline.process(&window("com.whatsapp", ts, "chat message"));
    }
    for ts in [60_000, 60_010, 180_000] {
        pipeline.process(&window("com.google.android.youtube", ts, "video"));
    }
    pipeline.shutdown(180_000);

    let sessions = database.list_sessions_in_range(0, 200_000).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.status == SessionStatus::Closed));

    let totals = database.category_totals(0, 200_000).await.unwrap();
    assert_eq!(totals[0].category, "entertainment");
    assert_eq!(totals[0].duration_ms, 119_990);
    assert_eq!(totals[1].category, "social");
    assert_eq!(totals[1].duration_ms, 60_000);
}
