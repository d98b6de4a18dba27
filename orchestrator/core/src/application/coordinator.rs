// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Coordinator
//!
//! Owns one run: the event bus, the task board, the shared document and the
//! dispatcher that fans work out to specialists. The planning logic that
//! decides *which* tasks to create and *when* to consolidate lives outside
//! this crate; the coordinator only exposes the facilitator's operations.
//!
//! # Run Lifecycle
//!
//! ```text
//! new -> start(query) -> { create_tasks | dispatch | consolidate_section }* -> finish
//! ```
//!
//! `finish` consumes the coordinator, publishes `workflow_finished` and closes
//! the bus, so a subscriber sees every event of the run followed by
//! end-of-stream.

use crate::application::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
use crate::application::shared_document::SharedDocument;
use crate::application::taskboard::TaskBoard;
use crate::domain::config::ScratchpadConfig;
use crate::domain::document::{HistoryRecord, SlotKey};
use crate::domain::events::{EventType, ScratchpadEvent, ORCHESTRATOR_SOURCE};
use crate::domain::task::{StatusSummary, Task, TaskSpec};
use crate::error::ScratchpadResult;
use crate::infrastructure::event_bus::{EventBus, EventBusError, EventReceiver};
use crate::infrastructure::worker_registry::WorkerRegistry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Author recorded on consolidated slots.
pub const FACILITATOR: &str = "facilitator";

/// Run identifier: local start time plus a short random suffix,
/// e.g. `20260419-153012-a1b2c3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            &suffix[..6]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a finished run hands back.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// Untagged render of the final document.
    pub result: String,
    /// Tagged render as it stood before the first consolidation.
    pub raw_contributions: String,
    pub history: Vec<HistoryRecord>,
    pub summary: StatusSummary,
    pub document_version: u64,
    pub succeeded_dispatches: usize,
    pub failed_dispatches: usize,
    pub elapsed: Duration,
}

pub struct Coordinator {
    run_id: RunId,
    bus: EventBus,
    taskboard: Arc<TaskBoard>,
    document: Arc<SharedDocument>,
    dispatcher: Dispatcher,
    started: Instant,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl Coordinator {
    pub fn new(config: &ScratchpadConfig, registry: WorkerRegistry) -> Self {
        let run_id = RunId::generate();
        let bus = EventBus::new(config.event_bus_capacity);
        let taskboard = Arc::new(TaskBoard::new(bus.clone()));
        let document = Arc::new(SharedDocument::new(bus.clone()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&taskboard),
            Arc::clone(&document),
            bus.clone(),
            Arc::new(registry),
            config,
        );
        info!(run_id = %run_id, roles = ?dispatcher.roles(), "Coordinator created");

        Self {
            run_id,
            bus,
            taskboard,
            document,
            dispatcher,
            started: Instant::now(),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Take the single consumer end of this run's event stream.
    pub fn subscribe(&self) -> Result<EventReceiver, EventBusError> {
        self.bus.subscribe()
    }

    pub fn taskboard(&self) -> &Arc<TaskBoard> {
        &self.taskboard
    }

    pub fn document(&self) -> &Arc<SharedDocument> {
        &self.document
    }

    pub async fn start(&self, query: &str) -> ScratchpadResult<()> {
        info!(run_id = %self.run_id, "Workflow started");
        self.bus
            .publish(ScratchpadEvent::new(
                EventType::WorkflowStarted,
                ORCHESTRATOR_SOURCE,
                json!({ "run_id": self.run_id, "query": query }),
            ))
            .await?;
        Ok(())
    }

    pub async fn create_tasks(&self, specs: Vec<TaskSpec>) -> ScratchpadResult<Vec<Task>> {
        self.taskboard.create_tasks(specs).await
    }

    pub fn plan_status(&self) -> String {
        self.taskboard.status_report()
    }

    pub fn read_document(&self) -> String {
        self.document.render(true)
    }

    pub fn read_document_clean(&self) -> String {
        self.document.render(false)
    }

    pub async fn consolidate_section(&self, slot: SlotKey, content: &str) -> ScratchpadResult<u64> {
        self.document
            .consolidate_section(slot, FACILITATOR, content)
            .await
    }

    pub async fn dispatch(&self, request: DispatchRequest) -> ScratchpadResult<DispatchOutcome> {
        let outcome = self.dispatcher.dispatch(request).await?;
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(outcome)
    }

    /// Run every request concurrently and return the outcomes in request order.
    pub async fn dispatch_parallel(
        &self,
        requests: Vec<DispatchRequest>,
    ) -> Vec<ScratchpadResult<DispatchOutcome>> {
        info!(count = requests.len(), "Dispatching specialists in parallel");
        futures::future::join_all(requests.into_iter().map(|request| self.dispatch(request))).await
    }

    /// Close the run. Fails when dispatches were attempted and none succeeded;
    /// the bus is closed either way.
    pub async fn finish(self) -> anyhow::Result<RunOutcome> {
        let summary = self.taskboard.status_summary();
        let document_version = self.document.version();
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed();

        let published = self
            .bus
            .publish(ScratchpadEvent::new(
                EventType::WorkflowFinished,
                ORCHESTRATOR_SOURCE,
                json!({
                    "run_id": self.run_id,
                    "elapsed_secs": elapsed.as_secs_f64(),
                    "tasks_done": summary.done,
                    "tasks_total": summary.total,
                    "document_version": document_version,
                    "succeeded_dispatches": succeeded,
                    "failed_dispatches": failed,
                }),
            ))
            .await;
        self.bus.close();
        published?;

        if failed > 0 {
            warn!(run_id = %self.run_id, failed, succeeded, "Some specialist dispatches failed");
        }
        if succeeded == 0 && failed > 0 {
            anyhow::bail!("All {failed} specialist dispatches failed");
        }

        info!(
            run_id = %self.run_id,
            elapsed_secs = elapsed.as_secs_f64(),
            tasks_done = summary.done,
            tasks_total = summary.total,
            document_version,
            "Workflow finished"
        );

        Ok(RunOutcome {
            result: self.document.render(false),
            raw_contributions: self.document.raw_contributions(),
            history: self.document.get_history(),
            run_id: self.run_id,
            summary,
            document_version,
            succeeded_dispatches: succeeded,
            failed_dispatches: failed,
            elapsed,
        })
    }
}
