// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Artifact Writer - persists a finished run to the output directory
//
// Two files per run:
//   {run_id}-document.md   header (run id, timestamp, query) followed by the final document
//   {run_id}-history.json  every document mutation, pretty-printed

use crate::application::coordinator::RunOutcome;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifacts {
    pub document: PathBuf,
    pub history: PathBuf,
}

pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn save(&self, outcome: &RunOutcome, query: &str) -> Result<SavedArtifacts> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {:?}", self.output_dir)
        })?;

        let document = self
            .output_dir
            .join(format!("{}-document.md", outcome.run_id));
        let markdown = format!(
            "# Shared Document\n\n- **Run ID:** `{}`\n- **Timestamp:** {}\n- **Query:** {}\n\n---\n\n{}\n",
            outcome.run_id,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            query,
            outcome.result
        );
        fs::write(&document, markdown)
            .with_context(|| format!("Failed to write document artifact: {:?}", document))?;

        let history = self
            .output_dir
            .join(format!("{}-history.json", outcome.run_id));
        let content = serde_json::to_string_pretty(&outcome.history)
            .context("Failed to serialize document history")?;
        fs::write(&history, content)
            .with_context(|| format!("Failed to write history artifact: {:?}", history))?;

        info!(run_id = %outcome.run_id, document = ?document, history = ?history, "Saved run artifacts");
        Ok(SavedArtifacts { document, history })
    }
}
