use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::classification::record_user_feedback;
use crate::models::ScreenEvent;
use crate::pipeline::UsagePipeline;
use crate::utils::now_ms;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// One message from the event source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeMessage {
    Event(ScreenEvent),
    /// The source window disappeared or the observing service stopped.
    EndOfSignal { timestamp_ms: i64 },
    /// Explicit user correction of an app's category.
    Feedback { package_id: String, category: String },
}

/// Feeds messages into `pipeline` in arrival order until the channel closes or
/// the token is cancelled. Either way an end-of-signal is run through the
/// session manager before the writer is drained.
pub async fn intake_loop(
    mut pipeline: UsagePipeline,
    mut messages: mpsc::Receiver<IntakeMessage>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            message = messages.recv() => {
                match message {
                    Some(message) => handle_message(&mut pipeline, message).await,
                    None => {
                        log_info!("intake channel closed");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("intake loop cancelled");
                break;
            }
        }
    }

    let end_ms = pipeline.last_event_ms().unwrap_or_else(now_ms);
    let failed_writes = pipeline.failed_writes();
    // Joining the writer blocks, so it happens off the async workers.
    match tokio::task::spawn_blocking(move || pipeline.shutdown(end_ms)).await {
        Ok(()) => log_info!("intake loop shut down at {end_ms} ({failed_writes} failed writes)"),
        Err(err) => log_error!("pipeline shutdown task failed: {err:?}"),
    }
}

async fn handle_message(pipeline: &mut UsagePipeline, message: IntakeMessage) {
    match message {
        IntakeMessage::Event(event) => {
            let command = pipeline.process(&event);
            if !command.is_ignore() {
                log_debug!("{} @ {} -> {:?}", event.package_id, event.timestamp_ms, command);
            }
        }
        IntakeMessage::EndOfSignal { timestamp_ms } => {
            pipeline.end_of_signal(timestamp_ms);
            log_info!("end of signal at {timestamp_ms}");
        }
        IntakeMessage::Feedback {
            package_id,
            category,
        } => {
            let store = pipeline.feedback_store();
            let recorded = tokio::task::spawn_blocking(move || {
                record_user_feedback(store.as_ref(), &package_id, &category, now_ms())
            })
            .await;

            match recorded {
                Ok(Ok(record)) => log_info!(
                    "feedback recorded: {} -> {} (x{}, confidence {:.2})",
                    record.package_id,
                    record.category,
                    record.feedback_count,
                    record.confidence
                ),
                Ok(Err(err)) => log_warn!("failed to record feedback: {err:?}"),
                Err(err) => log_error!("feedback task failed: {err:?}"),
            }
        }
    }
}
