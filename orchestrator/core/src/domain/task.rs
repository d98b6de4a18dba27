// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Domain Types
//!
//! Value types for the task board:
//!
//! - [`TaskId`] : monotonically assigned identifier, starting at 1.
//! - [`TaskSpec`] : a task definition before it has been placed on the board.
//! - [`Task`] : a placed task. `finished` moves false → true exactly once.
//! - [`StatusSummary`] : derived done/total/pending counts.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a [`Task`]. Never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub const FIRST: TaskId = TaskId(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A task definition submitted to `TaskBoard::create_tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub text: String,
    /// Logical role name, not a worker instance.
    pub assigned_to: String,
}

impl TaskSpec {
    pub fn new(text: impl Into<String>, assigned_to: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            assigned_to: assigned_to.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub assigned_to: String,
    finished: bool,
}

impl Task {
    pub(crate) fn new(id: TaskId, spec: TaskSpec) -> Self {
        Self {
            id,
            text: spec.text,
            assigned_to: spec.assigned_to,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Marks the task finished. Returns `true` only on the false → true transition.
    pub(crate) fn finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub done: usize,
    pub total: usize,
    pub pending_ids: Vec<TaskId>,
}

impl StatusSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut done = 0;
        let mut total = 0;
        let mut pending_ids = Vec::new();
        for task in tasks {
            total += 1;
            if task.is_finished() {
                done += 1;
            } else {
                pending_ids.push(task.id);
            }
        }
        Self {
            done,
            total,
            pending_ids,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task(s) not found: {}", join_ids(.0))]
    NotFound(Vec<TaskId>),
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
