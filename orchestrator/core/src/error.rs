// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::document::DocumentError;
use crate::domain::task::TaskError;
use crate::infrastructure::event_bus::EventBusError;
use thiserror::Error;

/// Errors surfaced by task board and shared document operations.
///
/// Worker failures are not part of this type: the dispatcher converts them
/// into observable events and a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScratchpadError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Event publication failed: {0}")]
    EventBus(#[from] EventBusError),
}

pub type ScratchpadResult<T> = Result<T, ScratchpadError>;
