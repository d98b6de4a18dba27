// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Worker
//!
//! Boundary types for the external worker-invocation collaborator: the
//! request handed to a specialist, the sink its incremental output flows
//! through, and the failures it can report.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary between dispatch bookkeeping and remote specialists

use crate::domain::task::TaskId;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRequest {
    pub role: String,
    pub task_ids: Vec<TaskId>,
    /// Full instruction text, including the assigned task context.
    pub instruction: String,
}

/// Sending half of a dispatch's chunk relay.
///
/// `send` is for workers running on the async runtime; `blocking_send` is for
/// workers running on a plain or blocking-pool thread. Both wait for buffer
/// space instead of dropping chunks.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    sender: mpsc::Sender<String>,
}

impl ChunkSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub async fn send(&self, chunk: impl Into<String>) -> Result<(), WorkerError> {
        self.sender
            .send(chunk.into())
            .await
            .map_err(|_| WorkerError::Transport("chunk relay closed".to_string()))
    }

    pub fn blocking_send(&self, chunk: impl Into<String>) -> Result<(), WorkerError> {
        self.sender
            .blocking_send(chunk.into())
            .map_err(|_| WorkerError::Transport("chunk relay closed".to_string()))
    }
}

/// Failure of a single worker invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote specialist error: {0}")]
    Remote(String),

    #[error("Worker call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Worker task aborted: {0}")]
    Panicked(String),

    #[error("No worker registered for role '{0}'")]
    UnknownRole(String),
}

impl WorkerError {
    /// Whether the coordinator may reasonably retry the same dispatch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Transport(_) | WorkerError::Timeout(_))
    }
}
