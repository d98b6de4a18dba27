// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Specialist
//!
//! The capability interface a specialist worker implements, and the tool
//! surface ([`SpecialistContext`]) it is handed for one invocation.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Seam between dispatch bookkeeping and external specialists

use crate::application::shared_document::SharedDocument;
use crate::application::taskboard::TaskBoard;
use crate::domain::document::SlotKey;
use crate::domain::task::{Task, TaskId};
use crate::domain::worker::{ChunkSink, WorkerError, WorkerRequest};
use crate::error::ScratchpadResult;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// A worker that can be dispatched by role name.
///
/// Implementations stream partial output through `chunks` as it becomes
/// available and return the final full text. Returning an empty string makes
/// the dispatcher fall back to the concatenated chunks.
#[async_trait]
pub trait SpecialistWorker: Send + Sync {
    async fn invoke(
        &self,
        context: SpecialistContext,
        request: WorkerRequest,
        chunks: ChunkSink,
    ) -> Result<String, WorkerError>;
}

/// Task board and document access bound to one role and one assigned task set.
///
/// Built fresh for every dispatch; nothing carries over between invocations of
/// the same role.
#[derive(Clone)]
pub struct SpecialistContext {
    role: String,
    assigned: Arc<BTreeSet<TaskId>>,
    taskboard: Arc<TaskBoard>,
    document: Arc<SharedDocument>,
}

impl SpecialistContext {
    pub fn new(
        role: impl Into<String>,
        assigned: &[TaskId],
        taskboard: Arc<TaskBoard>,
        document: Arc<SharedDocument>,
    ) -> Self {
        Self {
            role: role.into(),
            assigned: Arc::new(assigned.iter().copied().collect()),
            taskboard,
            document,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn assigned_task_ids(&self) -> Vec<TaskId> {
        self.assigned.iter().copied().collect()
    }

    pub fn read_tasks(&self, ids: &[TaskId]) -> Vec<Task> {
        self.taskboard.read_tasks(ids)
    }

    /// Complete a task. Ids outside the assigned set are still completed but
    /// logged, so misrouted completions stay visible.
    pub async fn complete_task(&self, id: TaskId) -> ScratchpadResult<Task> {
        if !self.assigned.contains(&id) {
            warn!(
                role = %self.role,
                task_id = %id,
                assigned = ?self.assigned,
                "Specialist completed a task outside its assigned set"
            );
        }
        self.taskboard.complete_task(id).await
    }

    pub fn read_document(&self) -> String {
        self.document.render(true)
    }

    /// Append a candidate entry authored by this role.
    pub async fn write_section(&self, slot: SlotKey, content: &str) -> ScratchpadResult<u64> {
        self.document.write_section(slot, &self.role, content).await
    }
}

/// Adapter for workers that make a blocking call, such as a synchronous
/// client with its own event loop. The closure runs on the blocking thread
/// pool and streams through [`ChunkSink::blocking_send`].
pub struct BlockingWorker<F> {
    call: Arc<F>,
}

impl<F> BlockingWorker<F>
where
    F: Fn(&WorkerRequest, &ChunkSink) -> Result<String, WorkerError> + Send + Sync + 'static,
{
    pub fn new(call: F) -> Self {
        Self {
            call: Arc::new(call),
        }
    }
}

#[async_trait]
impl<F> SpecialistWorker for BlockingWorker<F>
where
    F: Fn(&WorkerRequest, &ChunkSink) -> Result<String, WorkerError> + Send + Sync + 'static,
{
    async fn invoke(
        &self,
        _context: SpecialistContext,
        request: WorkerRequest,
        chunks: ChunkSink,
    ) -> Result<String, WorkerError> {
        let call = Arc::clone(&self.call);
        tokio::task::spawn_blocking(move || call(&request, &chunks))
            .await
            .map_err(|e| WorkerError::Panicked(e.to_string()))?
    }
}
