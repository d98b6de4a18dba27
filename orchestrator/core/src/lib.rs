// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Scratchpad Core
//!
//! Coordination substrate for concurrent specialist agents: a task board, a
//! slot-keyed shared document, and an ordered event bridge from worker
//! threads to a single consumer.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Task lifecycle, shared document, dispatch and event streaming

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod error;

pub use domain::*;
pub use error::{ScratchpadError, ScratchpadResult};
