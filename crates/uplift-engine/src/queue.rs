//! Event router and per-instance serial queues.

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use uplift_core::{InstanceId, UploadEvent};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum DispatchMode {
    /// One task per event; uploads for one instance may overlap.
    #[default]
    Concurrent,
    /// One worker per instance fed by a bounded queue. Events arriving
    /// while the queue is full are dropped.
    SerialPerInstance { capacity: usize },
}

pub(crate) struct Router {
    dispatcher: Dispatcher,
    mode: DispatchMode,
    outcomes: Option<UnboundedSender<DispatchOutcome>>,
    workers: HashMap<InstanceId, mpsc::Sender<UploadEvent>>,
}

impl Router {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        mode: DispatchMode,
        outcomes: Option<UnboundedSender<DispatchOutcome>>,
    ) -> Self {
        Self {
            dispatcher,
            mode,
            outcomes,
            workers: HashMap::new(),
        }
    }

    pub(crate) fn spawn(self, events: UnboundedReceiver<UploadEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    /// Runs until every event sender is gone, then lets the serial
    /// workers drain what they already hold.
    async fn run(mut self, mut events: UnboundedReceiver<UploadEvent>) {
        log::debug!("event router started ({:?})", self.mode);
        while let Some(event) = events.recv().await {
            match self.mode {
                DispatchMode::Concurrent => {
                    let dispatcher = self.dispatcher.clone();
                    let outcomes = self.outcomes.clone();
                    tokio::spawn(async move {
                        let outcome = dispatcher.dispatch(event).await;
                        report(&outcomes, outcome);
                    });
                }
                DispatchMode::SerialPerInstance { capacity } => self.enqueue(event, capacity),
            }
        }
        self.workers.clear();
        log::debug!("event router stopped");
    }

    fn enqueue(&mut self, event: UploadEvent, capacity: usize) {
        let id = event.instance_id;
        let queue = self
            .workers
            .entry(id)
            .or_insert_with(|| spawn_worker(id, capacity, self.dispatcher.clone(), self.outcomes.clone()));

        match queue.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => log::warn!(
                "instance {}: upload queue full ({}), dropping {}",
                id,
                capacity,
                event.path.display()
            ),
            Err(TrySendError::Closed(event)) => {
                log::error!("instance {}: upload worker gone, dropping {}", id, event.path.display());
                self.workers.remove(&id);
            }
        }
    }
}

fn spawn_worker(
    id: InstanceId,
    capacity: usize,
    dispatcher: Dispatcher,
    outcomes: Option<UnboundedSender<DispatchOutcome>>,
) -> mpsc::Sender<UploadEvent> {
    let (tx, mut rx) = mpsc::channel::<UploadEvent>(capacity.max(1));
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let outcome = dispatcher.dispatch(event).await;
            report(&outcomes, outcome);
        }
        log::debug!("instance {}: upload worker finished", id);
    });
    tx
}

fn report(outcomes: &Option<UnboundedSender<DispatchOutcome>>, outcome: DispatchOutcome) {
    if let Some(tx) = outcomes {
        let _ = tx.send(outcome);
    }
}
