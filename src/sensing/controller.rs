use anyhow::{anyhow, bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pipeline::UsagePipeline;

use super::loop_worker::{intake_loop, IntakeMessage};

const INTAKE_QUEUE_CAPACITY: usize = 1024;

/// Owns the intake loop task and the sending half of its queue.
pub struct IntakeController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    sender: Option<mpsc::Sender<IntakeMessage>>,
}

impl Default for IntakeController {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            sender: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, pipeline: UsagePipeline) -> Result<()> {
        if self.handle.is_some() {
            bail!("intake already active");
        }

        let cancel_token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(INTAKE_QUEUE_CAPACITY);
        let handle = tokio::spawn(intake_loop(pipeline, receiver, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.sender = Some(sender);
        info!("Intake loop started");
        Ok(())
    }

    /// Queues a message, waiting for room when the loop falls behind.
    pub async fn send(&self, message: IntakeMessage) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("intake is not running"))?;
        sender
            .send(message)
            .await
            .map_err(|_| anyhow!("intake loop is gone"))
    }

    /// Lets the loop consume everything already queued, then waits for it to
    /// finalize the open session.
    pub async fn finish(&mut self) -> Result<()> {
        self.sender.take();
        self.cancel_token.take();
        self.join().await
    }

    /// Stops the loop without draining the queue. The open session is still
    /// closed before the loop exits.
    pub async fn stop(&mut self) -> Result<()> {
        self.sender.take();
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.await.context("intake loop task failed to join")
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::classification::{KeywordStore, PackageRuleTable};
    use crate::db::{MemoryFeedbackStore, MemorySessionStore};
    use crate::models::{EventKind, ScreenEvent};
    use crate::pipeline::PipelineParts;
    use crate::settings::PipelineSettings;

    fn pipeline(sessions: Arc<MemorySessionStore>) -> UsagePipeline {
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

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut controller = IntakeController::new();
        controller.start(pipeline(Arc::new(MemorySessionStore::new()))).unwrap();

        let err = controller
            .start(pipeline(Arc::new(MemorySessionStore::new())))
            .unwrap_err();
        assert!(err.to_string().contains("already active"));

        controller.stop().await.unwrap();
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn finish_drains_queued_events() {
        let sessions = Arc::new(MemorySessionStore::new());
        let mut controller = IntakeController::new();
        controller.start(pipeline(sessions.clone())).unwrap();

        for ts in [0, 1_000, 2_000] {
            controller
                .send(IntakeMessage::Event(ScreenEvent::new(
                    "com.whatsapp",
                    ts,
                    "chat",
                    EventKind::WindowStateChanged,
                )))
                .await
                .unwrap();
        }
        controller.finish().await.unwrap();

        let stored = sessions.sessions();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].end_ms, 2_000);
        assert!(!stored[0].is_open());
        assert!(controller.send(IntakeMessage::EndOfSignal { timestamp_ms: 0 }).await.is_err());
    }
}
