// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`scratchpad-core`)
//!
//! HTTP surface over a run's event stream. No coordination logic lives here.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`sse`] | HTTP/SSE (Axum) | Server-Sent Events stream of run events |

pub mod sse;
