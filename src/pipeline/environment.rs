// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Deterministic environment for build processes

use serde::Serialize;
use std::collections::BTreeMap;

/// Variables that suppress nondeterminism in the packaging tools.
///
/// Applied as an overlay to every process a build launches; the parent
/// process environment is never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeterministicEnv {
    vars: BTreeMap<String, String>,
}

/// Variables pinned by the build itself; configuration cannot override them
pub const PINNED_VARS: &[&str] = &["SOURCE_DATE_EPOCH", "PYTHONHASHSEED"];

impl DeterministicEnv {
    /// Pin timestamps to `epoch` and disable hash randomisation
    pub fn new(epoch: i64) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("SOURCE_DATE_EPOCH".to_string(), epoch.to_string());
        vars.insert("PYTHONHASHSEED".to_string(), "0".to_string());
        Self { vars }
    }

    /// Add configured variables, leaving the pinned ones alone
    pub fn with_extra(mut self, extra: &BTreeMap<String, String>) -> Self {
        for (key, value) in extra {
            if PINNED_VARS.contains(&key.as_str()) {
                tracing::warn!(var = %key, "ignoring override of pinned build variable");
                continue;
            }
            self.vars.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}
