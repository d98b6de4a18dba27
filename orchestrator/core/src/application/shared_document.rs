// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Shared Document
//!
//! Slot-keyed collaborative workspace written by concurrent specialists.
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | [`SharedDocument::write_section`] | append a candidate entry to one slot |
//! | [`SharedDocument::consolidate_section`] | replace a slot's candidates with one entry |
//! | [`SharedDocument::render`] | pure read, day then time-slot order |
//! | [`SharedDocument::get_history`] | every versioned mutation, oldest first |
//!
//! Specialists never read-modify-write a slot: they only add candidates.
//! Consolidation is the single replace operation and is reserved for the
//! coordinator. Versions are assigned under the same lock as the mutation they
//! describe, so they are unique and strictly increasing across all slots.

use crate::domain::document::{DocumentAction, HistoryRecord, SlotEntry, SlotKey, TimeSlot};
use crate::domain::events::{EventType, ScratchpadEvent, DOCUMENT_SOURCE};
use crate::error::ScratchpadResult;
use crate::infrastructure::event_bus::EventBus;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

pub const EMPTY_DOCUMENT: &str = "(empty document)";

#[derive(Default)]
struct DocumentState {
    slots: BTreeMap<SlotKey, Vec<SlotEntry>>,
    version: u64,
    history: Vec<HistoryRecord>,
    // Slots as they stood just before the first consolidation.
    raw_contributions: Option<Slots>,
}

type Slots = BTreeMap<SlotKey, Vec<SlotEntry>>;

/// Payload of one `document_updated` notification, captured under the lock
/// and rendered after it is released.
struct MutationNotice {
    record: HistoryRecord,
    candidate_count: usize,
    slots: Slots,
}

pub struct SharedDocument {
    state: Mutex<DocumentState>,
    bus: EventBus,
}

impl SharedDocument {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: Mutex::new(DocumentState::default()),
            bus,
        }
    }

    /// Append a candidate entry to `slot` and return the new document version.
    pub async fn write_section(
        &self,
        slot: SlotKey,
        author: &str,
        content: &str,
    ) -> ScratchpadResult<u64> {
        let notice = {
            let mut state = self.state.lock();
            let entry = SlotEntry::new(author, content);
            let timestamp = entry.timestamp;
            let candidates = state.slots.entry(slot).or_default();
            candidates.push(entry);
            let candidate_count = candidates.len();

            state.version += 1;
            let record = HistoryRecord {
                version: state.version,
                action: DocumentAction::Write,
                slot,
                author: author.to_string(),
                content: content.to_string(),
                timestamp,
                superseded: Vec::new(),
            };
            state.history.push(record.clone());
            MutationNotice {
                record,
                candidate_count,
                slots: state.slots.clone(),
            }
        };

        info!(
            author,
            day = slot.day,
            time_slot = %slot.time_slot,
            version = notice.record.version,
            "SharedDocument: wrote section"
        );
        self.notify(notice).await
    }

    /// Replace every candidate in `slot` with a single entry. The replaced
    /// candidates are kept in the history record. An empty slot is legal.
    pub async fn consolidate_section(
        &self,
        slot: SlotKey,
        author: &str,
        content: &str,
    ) -> ScratchpadResult<u64> {
        let notice = {
            let mut state = self.state.lock();
            if state.raw_contributions.is_none() {
                let snapshot = state.slots.clone();
                state.raw_contributions = Some(snapshot);
            }

            let entry = SlotEntry::new(author, content);
            let timestamp = entry.timestamp;
            let superseded = state.slots.insert(slot, vec![entry]).unwrap_or_default();

            state.version += 1;
            let record = HistoryRecord {
                version: state.version,
                action: DocumentAction::Consolidate,
                slot,
                author: author.to_string(),
                content: content.to_string(),
                timestamp,
                superseded,
            };
            state.history.push(record.clone());
            MutationNotice {
                record,
                candidate_count: 1,
                slots: state.slots.clone(),
            }
        };

        info!(
            author,
            day = slot.day,
            time_slot = %slot.time_slot,
            version = notice.record.version,
            superseded = notice.record.superseded.len(),
            "SharedDocument: consolidated section"
        );
        self.notify(notice).await
    }

    /// Render all slots. With `show_author_tags` each entry is prefixed by `[author]`.
    pub fn render(&self, show_author_tags: bool) -> String {
        let slots = self.state.lock().slots.clone();
        render_slots(&slots, show_author_tags)
    }

    pub fn get_history(&self) -> Vec<HistoryRecord> {
        self.state.lock().history.clone()
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Current candidates of one slot.
    pub fn slot_entries(&self, slot: SlotKey) -> Vec<SlotEntry> {
        self.state
            .lock()
            .slots
            .get(&slot)
            .cloned()
            .unwrap_or_default()
    }

    /// Tagged render taken just before the first consolidation, or the
    /// current tagged render if nothing has been consolidated yet.
    pub fn raw_contributions(&self) -> String {
        let slots = {
            let state = self.state.lock();
            state
                .raw_contributions
                .clone()
                .unwrap_or_else(|| state.slots.clone())
        };
        render_slots(&slots, true)
    }

    async fn notify(&self, notice: MutationNotice) -> ScratchpadResult<u64> {
        let record = notice.record;
        let rendered = render_slots(&notice.slots, true);
        metrics::counter!("scratchpad_document_mutations_total", "action" => record.action.as_str())
            .increment(1);
        self.bus
            .publish(ScratchpadEvent::new(
                EventType::DocumentUpdated,
                DOCUMENT_SOURCE,
                json!({
                    "version": record.version,
                    "action": record.action,
                    "slot": record.slot,
                    "author": record.author,
                    "candidate_count": notice.candidate_count,
                    "content": rendered,
                }),
            ))
            .await?;
        Ok(record.version)
    }
}

fn day_heading(day: u32) -> String {
    if day == 0 {
        "## General".to_string()
    } else {
        format!("## Day {day}")
    }
}

fn render_slots(slots: &Slots, show_author_tags: bool) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_day = None;

    for (key, entries) in slots.iter().filter(|(_, entries)| !entries.is_empty()) {
        if current_day != Some(key.day) {
            if current_day.is_some() {
                lines.push(String::new());
            }
            lines.push(day_heading(key.day));
            current_day = Some(key.day);
        }
        if key.time_slot != TimeSlot::General {
            lines.push(format!("### {}", key.time_slot.heading()));
        }
        for entry in entries {
            if show_author_tags {
                lines.push(format!("[{}] {}", entry.author, entry.content));
            } else {
                lines.push(entry.content.clone());
            }
        }
    }

    if lines.is_empty() {
        return EMPTY_DOCUMENT.to_string();
    }
    lines.join("\n").trim().to_string()
}
