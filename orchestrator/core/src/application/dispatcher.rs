// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatcher Application Service
//!
//! Drives one specialist invocation against an assigned task subset.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Worker invocation lifecycle and completion safety net
//! - **Dependencies:** TaskBoard, SharedDocument, EventBus, WorkerRegistry
//!
//! # Invocation Lifecycle
//!
//! ```text
//! PENDING -> STARTED -> (STREAMING)* -> COMPLETED | FAILED
//! ```
//!
//! The worker runs in its own task. Its chunks cross into the dispatcher over a
//! bounded channel and are relayed to the event bus as `agent_streaming` events
//! as they arrive. On success the output is appended to the shared document and
//! any assigned task still open is auto-completed. On failure nothing is written
//! and nothing is auto-completed. The dispatcher never retries.
//!
//! The worker timeout covers the worker call alone; time spent waiting for
//! the event consumer while relaying chunks is not charged to the worker.

use crate::application::shared_document::SharedDocument;
use crate::application::specialist::SpecialistContext;
use crate::application::taskboard::TaskBoard;
use crate::domain::config::ScratchpadConfig;
use crate::domain::document::SlotKey;
use crate::domain::events::{EventType, ScratchpadEvent};
use crate::domain::task::{Task, TaskError, TaskId};
use crate::domain::worker::{ChunkSink, WorkerError, WorkerRequest};
use crate::error::ScratchpadResult;
use crate::infrastructure::event_bus::{EventBus, EventBusError};
use crate::infrastructure::worker_registry::WorkerRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// One dispatch of a role against a task subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub role: String,
    pub task_ids: Vec<TaskId>,
    /// Short natural-language instruction; task details are appended from the board.
    pub message: String,
    /// Slot for the specialist's output. `None` uses the configured default.
    pub slot: Option<SlotKey>,
}

impl DispatchRequest {
    pub fn new(role: impl Into<String>, task_ids: Vec<TaskId>, message: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            task_ids,
            message: message.into(),
            slot: None,
        }
    }

    pub fn with_slot(mut self, slot: SlotKey) -> Self {
        self.slot = Some(slot);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Completed {
        role: String,
        summary: String,
        version: u64,
        auto_completed: Vec<TaskId>,
        elapsed: Duration,
    },
    Failed {
        role: String,
        error: String,
        retryable: bool,
    },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Completed { .. })
    }

    pub fn role(&self) -> &str {
        match self {
            DispatchOutcome::Completed { role, .. } | DispatchOutcome::Failed { role, .. } => role,
        }
    }
}

pub struct Dispatcher {
    taskboard: Arc<TaskBoard>,
    document: Arc<SharedDocument>,
    bus: EventBus,
    registry: Arc<WorkerRegistry>,
    worker_timeout: Duration,
    chunk_buffer: usize,
    strict_task_reads: bool,
    default_slot: SlotKey,
}

impl Dispatcher {
    pub fn new(
        taskboard: Arc<TaskBoard>,
        document: Arc<SharedDocument>,
        bus: EventBus,
        registry: Arc<WorkerRegistry>,
        config: &ScratchpadConfig,
    ) -> Self {
        Self {
            taskboard,
            document,
            bus,
            registry,
            worker_timeout: config.worker_timeout(),
            chunk_buffer: config.chunk_buffer,
            strict_task_reads: config.strict_task_reads,
            default_slot: config.default_slot,
        }
    }

    /// Registered role names, sorted.
    pub fn roles(&self) -> Vec<String> {
        self.registry
            .definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect()
    }

    /// Run one invocation to a terminal state.
    ///
    /// Worker failures come back as [`DispatchOutcome::Failed`]; `Err` is
    /// reserved for event publication failures, which indicate the run was
    /// closed while dispatches were still in flight.
    pub async fn dispatch(&self, request: DispatchRequest) -> ScratchpadResult<DispatchOutcome> {
        let role = request.role.clone();
        let resolved = self.registry.resolve(&role);
        let display_name = resolved
            .as_ref()
            .map(|(definition, _)| definition.display_name.clone())
            .unwrap_or_else(|| role.clone());

        let (tasks, missing) = self.read_assigned(&request.task_ids);
        let instruction = build_instruction(&request.message, &tasks);

        info!(role = %role, task_ids = ?request.task_ids, "Dispatching specialist");
        self.publish(
            &role,
            EventType::AgentStarted,
            json!({
                "task_ids": request.task_ids,
                "instruction": instruction,
                "display_name": display_name,
            }),
        )
        .await?;

        let Some((_, worker)) = resolved else {
            return self.fail(&role, WorkerError::UnknownRole(role.clone())).await;
        };
        if let Some(missing) = missing {
            return self.fail_with(&role, missing.to_string(), false).await;
        }

        let started = Instant::now();
        let (chunks, chunk_rx) = ChunkSink::channel(self.chunk_buffer);
        let context = SpecialistContext::new(
            role.clone(),
            &request.task_ids,
            Arc::clone(&self.taskboard),
            Arc::clone(&self.document),
        );
        let worker_request = WorkerRequest {
            role: role.clone(),
            task_ids: request.task_ids.clone(),
            instruction,
        };
        // The deadline bounds the worker call only. Waiting on a full event bus
        // while relaying is backpressure, not worker latency.
        let worker_timeout = self.worker_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::timeout(worker_timeout, worker.invoke(context, worker_request, chunks))
                .await
                .unwrap_or(Err(WorkerError::Timeout(worker_timeout)))
        });

        let (streamed, result) = self.relay(&role, chunk_rx, handle).await?;

        let output = match result {
            Ok(text) if text.is_empty() => streamed,
            Ok(text) => text,
            Err(err) => return self.fail(&role, err).await,
        };

        let slot = request.slot.unwrap_or(self.default_slot);
        let version = self.document.write_section(slot, &role, &output).await?;
        let auto_completed: Vec<TaskId> = self
            .taskboard
            .auto_complete(&request.task_ids)
            .await?
            .into_iter()
            .map(|task| task.id)
            .collect();
        let elapsed = started.elapsed();

        self.publish(
            &role,
            EventType::AgentCompleted,
            json!({
                "elapsed_secs": elapsed.as_secs_f64(),
                "output_length": output.chars().count(),
                "auto_completed": auto_completed,
                "version": version,
            }),
        )
        .await?;

        metrics::counter!("scratchpad_dispatches_total", "role" => role.clone(), "outcome" => "completed")
            .increment(1);
        info!(
            role = %role,
            elapsed_secs = elapsed.as_secs_f64(),
            auto_completed = auto_completed.len(),
            "Specialist completed"
        );

        Ok(DispatchOutcome::Completed {
            summary: format!(
                "{} completed {} tasks in {:.1}s. Results written to the shared document.",
                display_name,
                request.task_ids.len(),
                elapsed.as_secs_f64()
            ),
            role,
            version,
            auto_completed,
            elapsed,
        })
    }

    /// Readable tasks for the instruction, plus the lookup failure when
    /// strict reads are enabled and some ids are unknown.
    fn read_assigned(&self, ids: &[TaskId]) -> (Vec<Task>, Option<TaskError>) {
        if !self.strict_task_reads {
            return (self.taskboard.read_tasks(ids), None);
        }
        match self.taskboard.read_tasks_strict(ids) {
            Ok(tasks) => (tasks, None),
            Err(err) => (self.taskboard.read_tasks(ids), Some(err)),
        }
    }

    /// Relay chunks until the worker finishes, then drain what is left.
    /// Returns the concatenated chunks and the worker's own result.
    async fn relay(
        &self,
        role: &str,
        mut chunks: mpsc::Receiver<String>,
        mut worker: JoinHandle<Result<String, WorkerError>>,
    ) -> Result<(String, Result<String, WorkerError>), EventBusError> {
        let mut streamed = String::new();
        let joined = loop {
            tokio::select! {
                biased;
                chunk = chunks.recv() => match chunk {
                    Some(delta) => self.relay_delta(role, &mut streamed, delta).await?,
                    None => break (&mut worker).await,
                },
                joined = &mut worker => {
                    while let Ok(delta) = chunks.try_recv() {
                        self.relay_delta(role, &mut streamed, delta).await?;
                    }
                    break joined;
                }
            }
        };
        let result = joined.unwrap_or_else(|e| Err(WorkerError::Panicked(e.to_string())));
        Ok((streamed, result))
    }

    async fn relay_delta(&self, role: &str, streamed: &mut String, delta: String) -> Result<(), EventBusError> {
        streamed.push_str(&delta);
        self.bus
            .publish(ScratchpadEvent::new(
                EventType::AgentStreaming,
                role,
                json!({ "delta": delta }),
            ))
            .await
    }

    async fn fail(&self, role: &str, err: WorkerError) -> ScratchpadResult<DispatchOutcome> {
        let retryable = err.is_retryable();
        self.fail_with(role, err.to_string(), retryable).await
    }

    async fn fail_with(&self, role: &str, message: String, retryable: bool) -> ScratchpadResult<DispatchOutcome> {
        error!(role = %role, retryable, error = %message, "Specialist dispatch failed");
        metrics::counter!("scratchpad_dispatches_total", "role" => role.to_string(), "outcome" => "failed")
            .increment(1);
        self.publish(
            role,
            EventType::AgentError,
            json!({ "error": message, "retryable": retryable }),
        )
        .await?;
        Ok(DispatchOutcome::Failed {
            role: role.to_string(),
            error: message,
            retryable,
        })
    }

    async fn publish(&self, role: &str, event_type: EventType, data: serde_json::Value) -> ScratchpadResult<()> {
        self.bus
            .publish(ScratchpadEvent::new(event_type, role, data))
            .await?;
        Ok(())
    }
}

/// Instruction text sent to a worker: the caller's message followed by the
/// assigned tasks as read from the board.
pub fn build_instruction(message: &str, tasks: &[Task]) -> String {
    let mut instruction = format!("{message}\n\nYour assigned tasks:");
    for task in tasks {
        instruction.push_str(&format!("\n- Task {}: {}", task.id, task.text));
    }
    instruction
}
