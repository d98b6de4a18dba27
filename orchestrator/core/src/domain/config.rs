// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Scratchpad Configuration
//
// Run-level tunables for the coordination substrate:
// - Event bus and chunk relay capacities
// - Worker call timeout
// - Task read policy for unknown ids
// - Default document slot for specialist output
// - Artifact output directory

use crate::domain::document::SlotKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchpadConfig {
    /// Bounded capacity of the run's event bus. Publishers wait when full.
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Per-dispatch buffer between a worker and the streaming relay.
    #[serde(default = "default_chunk_buffer")]
    pub chunk_buffer: usize,

    /// Worker calls exceeding this are failed with a timeout.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// When true, dispatching unknown task ids fails instead of skipping them.
    #[serde(default)]
    pub strict_task_reads: bool,

    /// Slot the dispatcher writes specialist output into.
    #[serde(default)]
    pub default_slot: SlotKey,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_event_bus_capacity() -> usize {
    1024
}

fn default_chunk_buffer() -> usize {
    256
}

fn default_worker_timeout_secs() -> u64 {
    300
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for ScratchpadConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
            chunk_buffer: default_chunk_buffer(),
            worker_timeout_secs: default_worker_timeout_secs(),
            strict_task_reads: false,
            default_slot: SlotKey::general(),
            output_dir: default_output_dir(),
        }
    }
}

impl ScratchpadConfig {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SCRATCHPAD_CONFIG_PATH environment variable
    /// 2. ./scratchpad-config.yaml (working directory)
    /// 3. ~/.scratchpad/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SCRATCHPAD_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./scratchpad-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".scratchpad").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::debug!("No configuration file found. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("SCRATCHPAD_WORKER_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: SCRATCHPAD_WORKER_TIMEOUT_SECS={}", secs);
                    self.worker_timeout_secs = secs;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for SCRATCHPAD_WORKER_TIMEOUT_SECS: '{}'. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("SCRATCHPAD_EVENT_BUS_CAPACITY") {
            match val.parse::<usize>() {
                Ok(capacity) => {
                    tracing::info!("Environment override: SCRATCHPAD_EVENT_BUS_CAPACITY={}", capacity);
                    self.event_bus_capacity = capacity;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for SCRATCHPAD_EVENT_BUS_CAPACITY: '{}'. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("SCRATCHPAD_STRICT_TASK_READS") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => self.strict_task_reads = true,
                "false" | "0" | "no" | "off" => self.strict_task_reads = false,
                _ => tracing::warn!(
                    "Invalid value for SCRATCHPAD_STRICT_TASK_READS: '{}'. Expected true/false. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.event_bus_capacity == 0 {
            anyhow::bail!("event_bus_capacity must be greater than zero");
        }
        if self.chunk_buffer == 0 {
            anyhow::bail!("chunk_buffer must be greater than zero");
        }
        if self.worker_timeout_secs == 0 {
            anyhow::bail!("worker_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
