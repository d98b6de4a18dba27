// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source tag used for events emitted by the coordinator itself.
pub const ORCHESTRATOR_SOURCE: &str = "orchestrator";
pub const TASKBOARD_SOURCE: &str = "taskboard";
pub const DOCUMENT_SOURCE: &str = "document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkflowStarted,
    TasksCreated,
    TaskUpdated,
    AgentStarted,
    AgentStreaming,
    AgentCompleted,
    AgentError,
    DocumentUpdated,
    WorkflowFinished,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::WorkflowStarted => "workflow_started",
            EventType::TasksCreated => "tasks_created",
            EventType::TaskUpdated => "task_updated",
            EventType::AgentStarted => "agent_started",
            EventType::AgentStreaming => "agent_streaming",
            EventType::AgentCompleted => "agent_completed",
            EventType::AgentError => "agent_error",
            EventType::DocumentUpdated => "document_updated",
            EventType::WorkflowFinished => "workflow_finished",
        }
    }

    /// Terminal event of a single dispatch.
    pub fn is_agent_terminal(&self) -> bool {
        matches!(self, EventType::AgentCompleted | EventType::AgentError)
    }
}

/// A single event carried by the event bus. Immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchpadEvent {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub event_type: EventType,
    pub data: Value,
}

impl ScratchpadEvent {
    pub fn new(event_type: EventType, source: impl Into<String>, data: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            event_type,
            data,
        }
    }

    pub fn to_wire(&self) -> WireEvent {
        WireEvent::from(self)
    }
}

/// Shape consumed by live observers: `{event_type, source, timestamp, data}`
/// with `timestamp` in fractional unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub event_type: String,
    pub source: String,
    pub timestamp: f64,
    pub data: Value,
}

impl From<&ScratchpadEvent> for WireEvent {
    fn from(event: &ScratchpadEvent) -> Self {
        Self {
            event_type: event.event_type.as_str().to_string(),
            source: event.source.clone(),
            timestamp: event.timestamp.timestamp_millis() as f64 / 1000.0,
            data: event.data.clone(),
        }
    }
}
