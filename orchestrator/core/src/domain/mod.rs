// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types, events and configuration shared by every layer.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Tasks, document slots, run events, worker contracts

pub mod config;
pub mod document;
pub mod events;
pub mod task;
pub mod worker;
