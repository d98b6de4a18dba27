// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Shared Document Domain Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`TimeSlot`] | `general` < `morning` < `afternoon` < `evening` < `night` |
//! | [`SlotKey`] | `(day, time_slot)` address; day 0 is day-independent |
//! | [`SlotEntry`] | one candidate contribution, immutable once created |
//! | [`HistoryRecord`] | audit record appended for every versioned mutation |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    General,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeSlot {
    /// All slots in render order.
    pub const ALL: [TimeSlot; 5] = [
        TimeSlot::General,
        TimeSlot::Morning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::General => "general",
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
            TimeSlot::Night => "night",
        }
    }

    /// Capitalized label used for section headings.
    pub fn heading(&self) -> &'static str {
        match self {
            TimeSlot::General => "General",
            TimeSlot::Morning => "Morning",
            TimeSlot::Afternoon => "Afternoon",
            TimeSlot::Evening => "Evening",
            TimeSlot::Night => "Night",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| DocumentError::InvalidTimeSlot(s.to_string()))
    }
}

/// Address of a document region. Ordering is day first, then time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub day: u32,
    pub time_slot: TimeSlot,
}

impl SlotKey {
    pub fn new(day: u32, time_slot: TimeSlot) -> Self {
        Self { day, time_slot }
    }

    /// The day-independent general slot `(0, general)`.
    pub fn general() -> Self {
        Self::new(0, TimeSlot::General)
    }

    pub fn parse(day: u32, time_slot: &str) -> Result<Self, DocumentError> {
        Ok(Self::new(day, time_slot.parse()?))
    }
}

impl Default for SlotKey {
    fn default() -> Self {
        Self::general()
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day={} slot={}", self.day, self.time_slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl SlotEntry {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAction {
    Write,
    Consolidate,
}

impl DocumentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentAction::Write => "write",
            DocumentAction::Consolidate => "consolidate",
        }
    }
}

/// One versioned mutation of the document.
///
/// For `consolidate` records, `superseded` holds the candidate list that the
/// consolidation replaced. It is empty for `write` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub version: u64,
    pub action: DocumentAction,
    pub slot: SlotKey,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded: Vec<SlotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("Invalid time_slot '{0}'. Must be one of general, morning, afternoon, evening, night")]
    InvalidTimeSlot(String),
}
