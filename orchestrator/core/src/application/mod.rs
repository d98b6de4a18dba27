// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod coordinator;
pub mod dispatcher;
pub mod shared_document;
pub mod specialist;
pub mod taskboard;

// Re-export the run surface for convenience
pub use coordinator::{Coordinator, RunId, RunOutcome};
pub use dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
pub use shared_document::SharedDocument;
pub use specialist::{BlockingWorker, SpecialistContext, SpecialistWorker};
pub use taskboard::TaskBoard;
