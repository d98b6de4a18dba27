// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod artifacts;
pub mod event_bus;
pub mod telemetry;
pub mod worker_registry;

pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use worker_registry::{RoleDefinition, WorkerRegistry};
