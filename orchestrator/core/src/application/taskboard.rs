// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task Board
//!
//! In-memory task list shared by the coordinator and every concurrent
//! dispatch of a run.
//!
//! The only mutations are batch creation, idempotent completion and
//! safety-net auto-completion, each applied inside one short critical
//! section. Event publication happens after the state lock is released,
//! under a separate async lock held from mutation to publish, so the
//! consumer receives board snapshots in the order they were taken.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Task lifecycle state machine

use crate::domain::events::{EventType, ScratchpadEvent, TASKBOARD_SOURCE};
use crate::domain::task::{StatusSummary, Task, TaskError, TaskId, TaskSpec};
use crate::error::ScratchpadResult;
use crate::infrastructure::event_bus::EventBus;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

struct BoardState {
    // Keyed by id; ids are assigned in creation order so iteration order is creation order.
    tasks: BTreeMap<TaskId, Task>,
    next_id: TaskId,
}

pub struct TaskBoard {
    state: Mutex<BoardState>,
    // Serializes mutate-then-publish; reads never take it.
    publish_order: tokio::sync::Mutex<()>,
    bus: EventBus,
}

impl TaskBoard {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: Mutex::new(BoardState {
                tasks: BTreeMap::new(),
                next_id: TaskId::FIRST,
            }),
            publish_order: tokio::sync::Mutex::new(()),
            bus,
        }
    }

    /// Create a batch of tasks, assigning consecutive ids.
    pub async fn create_tasks(&self, specs: Vec<TaskSpec>) -> ScratchpadResult<Vec<Task>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let _order = self.publish_order.lock().await;
        let (created, snapshot) = {
            let mut state = self.state.lock();
            let mut created = Vec::with_capacity(specs.len());
            for spec in specs {
                let task = Task::new(state.next_id, spec);
                state.next_id = state.next_id.next();
                state.tasks.insert(task.id, task.clone());
                created.push(task);
            }
            (created, state.tasks.values().cloned().collect::<Vec<_>>())
        };

        let ids: Vec<TaskId> = created.iter().map(|t| t.id).collect();
        info!(count = created.len(), ids = ?ids, "TaskBoard: created tasks");
        metrics::counter!("scratchpad_tasks_created_total").increment(created.len() as u64);

        self.bus
            .publish(ScratchpadEvent::new(
                EventType::TasksCreated,
                TASKBOARD_SOURCE,
                json!({ "created": ids, "tasks": snapshot }),
            ))
            .await?;

        Ok(created)
    }

    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.values().cloned().collect()
    }

    /// Tasks matching `ids`, in creation order. Unknown ids are skipped.
    pub fn read_tasks(&self, ids: &[TaskId]) -> Vec<Task> {
        let wanted: BTreeSet<TaskId> = ids.iter().copied().collect();
        let state = self.state.lock();
        let found: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| wanted.contains(&t.id))
            .cloned()
            .collect();
        if found.len() < wanted.len() {
            debug!(requested = ?ids, found = found.len(), "TaskBoard: skipped unknown task ids");
        }
        found
    }

    /// Like [`TaskBoard::read_tasks`] but fails if any id is unknown.
    pub fn read_tasks_strict(&self, ids: &[TaskId]) -> Result<Vec<Task>, TaskError> {
        let wanted: BTreeSet<TaskId> = ids.iter().copied().collect();
        let state = self.state.lock();
        let missing: Vec<TaskId> = wanted
            .iter()
            .filter(|id| !state.tasks.contains_key(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(TaskError::NotFound(missing));
        }
        Ok(state
            .tasks
            .values()
            .filter(|t| wanted.contains(&t.id))
            .cloned()
            .collect())
    }

    /// Mark a task finished. Completing an already-finished task is a no-op
    /// that returns the task unchanged and publishes nothing.
    pub async fn complete_task(&self, id: TaskId) -> ScratchpadResult<Task> {
        let _order = self.publish_order.lock().await;
        let (task, transitioned, snapshot) = {
            let mut state = self.state.lock();
            let task = state
                .tasks
                .get_mut(&id)
                .ok_or_else(|| TaskError::NotFound(vec![id]))?;
            let transitioned = task.finish();
            let task = task.clone();
            let snapshot = transitioned.then(|| state.tasks.values().cloned().collect::<Vec<_>>());
            (task, transitioned, snapshot)
        };

        if let Some(snapshot) = snapshot {
            info!(task_id = %id, "TaskBoard: task completed");
            self.publish_update(id, false, snapshot).await?;
        } else {
            debug!(task_id = %id, transitioned, "TaskBoard: task already finished");
        }
        Ok(task)
    }

    /// Safety net run after a worker hands back: force-complete every task in
    /// `ids` that is still unfinished and return the ones that were forced.
    pub async fn auto_complete(&self, ids: &[TaskId]) -> ScratchpadResult<Vec<Task>> {
        let wanted: BTreeSet<TaskId> = ids.iter().copied().collect();
        let _order = self.publish_order.lock().await;
        let (forced, snapshot) = {
            let mut state = self.state.lock();
            let mut forced = Vec::new();
            for id in &wanted {
                if let Some(task) = state.tasks.get_mut(id) {
                    if task.finish() {
                        forced.push(task.clone());
                    }
                }
            }
            (forced, state.tasks.values().cloned().collect::<Vec<_>>())
        };

        for task in &forced {
            warn!(
                task_id = %task.id,
                assigned_to = %task.assigned_to,
                "TaskBoard: auto-completed task the specialist did not report"
            );
            metrics::counter!("scratchpad_tasks_auto_completed_total").increment(1);
            self.publish_update(task.id, true, snapshot.clone()).await?;
        }
        Ok(forced)
    }

    pub fn status_summary(&self) -> StatusSummary {
        StatusSummary::from_tasks(self.state.lock().tasks.values())
    }

    /// Human-readable status, one line per pending task.
    pub fn status_report(&self) -> String {
        let state = self.state.lock();
        let summary = StatusSummary::from_tasks(state.tasks.values());
        let mut lines = vec![format!("{}/{} tasks completed.", summary.done, summary.total)];
        if !summary.pending_ids.is_empty() {
            lines.push("Pending tasks:".to_string());
            for task in state.tasks.values().filter(|t| !t.is_finished()) {
                lines.push(format!("  - [{}] ({}): {}", task.id, task.assigned_to, task.text));
            }
        }
        lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn publish_update(&self, id: TaskId, auto_completed: bool, snapshot: Vec<Task>) -> ScratchpadResult<()> {
        self.bus
            .publish(ScratchpadEvent::new(
                EventType::TaskUpdated,
                TASKBOARD_SOURCE,
                json!({
                    "task_id": id,
                    "auto_completed": auto_completed,
                    "tasks": snapshot,
                }),
            ))
            .await?;
        Ok(())
    }
}
