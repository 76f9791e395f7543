// src/worker/actor.rs
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::backoff::Backoff;
use super::context::{CycleReport, WorkerContext};
use crate::error::FeedError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker unavailable")]
    Unavailable,

    #[error("check failed: {0}")]
    Cycle(String),
}

pub enum WorkerMessage {
    /// Run a cycle now, outside the timer, and report back.
    CheckNow {
        reply: oneshot::Sender<Result<CycleReport, WorkerError>>,
    },
}

/// Cheap, cloneable way into the worker. Requests queue behind the running
/// cycle, so two cycles never overlap.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    pub async fn check_now(&self) -> Result<CycleReport, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(WorkerMessage::CheckNow { reply })
            .await
            .map_err(|_| WorkerError::Unavailable)?;
        rx.await.map_err(|_| WorkerError::Unavailable)?
    }
}

pub struct WorkerActor {
    ctx: WorkerContext,
    backoff: Backoff,
    receiver: mpsc::Receiver<WorkerMessage>,
}

impl WorkerActor {
    pub fn new(ctx: WorkerContext, backoff: Backoff) -> (Self, WorkerHandle) {
        let (sender, receiver) = mpsc::channel(8);
        (
            Self {
                ctx,
                backoff,
                receiver,
            },
            WorkerHandle { sender },
        )
    }

    /// First check right away, then one per timer expiry. Never returns.
    pub async fn run(mut self) {
        tracing::info!("worker started");
        let mut next = Instant::now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next) => {
                    let ok = self.cycle().await.is_ok();
                    let delay = self.backoff.next_delay(ok);
                    tracing::debug!(delay_secs = delay.as_secs(), backing_off = !ok, "next check scheduled");
                    next = Instant::now() + delay;
                }
                Some(msg) = self.receiver.recv() => self.handle_message(msg).await,
            }
        }
    }

    async fn handle_message(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::CheckNow { reply } => {
                let result = self
                    .cycle()
                    .await
                    .map_err(|e| WorkerError::Cycle(e.to_string()));
                let _ = reply.send(result);
            }
        }
    }

    async fn cycle(&mut self) -> Result<CycleReport, FeedError> {
        match self.ctx.run_cycle().await {
            Ok(report) => {
                tracing::info!(
                    entries = report.entries,
                    sent = report.sent,
                    failed = report.failed,
                    cursor = %report.cursor,
                    "check finished"
                );
                Ok(report)
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(error = %e, "check failed");
                } else {
                    tracing::error!(error = %e, "check failed");
                }
                Err(e)
            }
        }
    }
}
