// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Worker Registry - Role Name to Specialist Resolution
//
// Maps logical role names to the worker that serves them. New roles are added
// by registering a worker; the dispatcher never changes.

use crate::application::specialist::SpecialistWorker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Descriptive metadata for a registered role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl RoleDefinition {
    /// Definition whose display name is the role name itself.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

struct RegisteredWorker {
    definition: RoleDefinition,
    worker: Arc<dyn SpecialistWorker>,
}

/// Registry for resolving role names to specialist workers
#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, RegisteredWorker>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `worker` under `definition.name`, replacing any previous registration.
    pub fn register(&mut self, definition: RoleDefinition, worker: Arc<dyn SpecialistWorker>) {
        info!(role = %definition.name, display_name = %definition.display_name, "Registering specialist worker");
        let name = definition.name.clone();
        if self
            .workers
            .insert(name.clone(), RegisteredWorker { definition, worker })
            .is_some()
        {
            warn!(role = %name, "Replaced existing specialist worker registration");
        }
    }

    /// Builder-style variant of [`WorkerRegistry::register`].
    pub fn with_worker(mut self, definition: RoleDefinition, worker: Arc<dyn SpecialistWorker>) -> Self {
        self.register(definition, worker);
        self
    }

    pub fn resolve(&self, role: &str) -> Option<(RoleDefinition, Arc<dyn SpecialistWorker>)> {
        self.workers
            .get(role)
            .map(|registered| (registered.definition.clone(), Arc::clone(&registered.worker)))
    }

    pub fn contains(&self, role: &str) -> bool {
        self.workers.contains_key(role)
    }

    /// Registered role definitions sorted by name.
    pub fn definitions(&self) -> Vec<RoleDefinition> {
        let mut definitions: Vec<RoleDefinition> = self
            .workers
            .values()
            .map(|registered| registered.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
