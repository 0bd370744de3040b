use crate::{
    actor::{
        actor::{Actor, ActorContext, ActorRef},
        messages::ProgressMsg,
        spawn::spawn_actor,
    },
    error::ActorError,
};
use async_trait::async_trait;
use engine_core::{ProgressSnapshot, ProgressTracker};
use model::execution::work::WorkResult;
use std::time::Instant;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info};

/// Sole owner of the run's progress counters. Workers report completed
/// items over the mailbox; nobody else touches the tracker.
pub struct ProgressActor {
    tracker: ProgressTracker,
    started: Instant,
    log_every: usize,
}

impl ProgressActor {
    pub fn new(log_every: usize) -> Self {
        Self {
            tracker: ProgressTracker::new(),
            started: Instant::now(),
            log_every,
        }
    }

    fn snapshot(&self) -> ProgressSnapshot {
        self.tracker.snapshot(self.started.elapsed())
    }
}

#[async_trait]
impl Actor<ProgressMsg> for ProgressActor {
    async fn on_start(&mut self, ctx: &ActorContext) -> Result<(), ActorError> {
        debug!(actor = ctx.name(), "Progress aggregator started");
        self.started = Instant::now();
        Ok(())
    }

    async fn handle(&mut self, msg: ProgressMsg, _ctx: &ActorContext) -> Result<(), ActorError> {
        match msg {
            ProgressMsg::Completed(result) => {
                self.tracker.record(&result);

                let processed = self.tracker.processed();
                if self.log_every > 0 && processed % self.log_every as u64 == 0 {
                    let snap = self.snapshot();
                    info!(
                        processed = snap.processed,
                        successful = snap.successful,
                        failed = snap.failed,
                        items_per_minute = format!("{:.1}", snap.items_per_minute),
                        "Progress"
                    );
                }
                Ok(())
            }

            ProgressMsg::Retried(count) => {
                self.tracker.record_retries(count);
                Ok(())
            }

            ProgressMsg::Snapshot(reply) => reply
                .send(self.snapshot())
                .map_err(|_| ActorError::Internal("snapshot requester went away".into())),
        }
    }

    async fn on_stop(&mut self, ctx: &ActorContext) -> Result<(), ActorError> {
        debug!(
            actor = ctx.name(),
            processed = self.tracker.processed(),
            "Progress aggregator stopped"
        );
        Ok(())
    }
}

/// Handle used by workers and the coordinator to talk to the aggregator.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    actor: ActorRef<ProgressMsg>,
}

impl ProgressHandle {
    pub fn spawn(log_every: usize, mailbox_capacity: usize) -> (Self, JoinHandle<()>) {
        let (actor, handle) =
            spawn_actor("progress", mailbox_capacity, ProgressActor::new(log_every));
        (Self { actor }, handle)
    }

    pub async fn completed(&self, result: WorkResult) -> Result<(), ActorError> {
        self.actor.send(ProgressMsg::Completed(Box::new(result))).await
    }

    pub async fn retried(&self, count: u64) -> Result<(), ActorError> {
        if count == 0 {
            return Ok(());
        }
        self.actor.send(ProgressMsg::Retried(count)).await
    }

    pub async fn snapshot(&self) -> Result<ProgressSnapshot, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.actor.send(ProgressMsg::Snapshot(tx)).await?;
        rx.await.map_err(|_| ActorError::MailboxClosed)
    }
}
