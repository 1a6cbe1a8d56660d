// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debugger command types shared across the bridge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length, in bytes, for a raw debugger command string.
pub const MAX_COMMAND_LENGTH: usize = 4096;

/// A raw debugger command string as received from a client.
///
/// Construction never fails; length and content checks are the job of the
/// validator, not this type. Keeping `Command` infallible to build lets
/// callers hold an owned, cheaply cloneable value all the way through the
/// pipeline before any validation has run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first whitespace-delimited token, lowercased, used for
    /// prefix/category lookups throughout the engine.
    pub fn base_word(&self) -> String {
        self.0
            .trim()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Classification of a command's execution characteristics, used to pick a
/// timeout and to decide whether a result may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Quick,
    Normal,
    Analysis,
    Bulk,
    LargeAnalysis,
    Extended,
    Symbols,
    ProcessList,
    Streaming,
    Memory,
    Execution,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Quick => "quick",
            Category::Normal => "normal",
            Category::Analysis => "analysis",
            Category::Bulk => "bulk",
            Category::LargeAnalysis => "large_analysis",
            Category::Extended => "extended",
            Category::Symbols => "symbols",
            Category::ProcessList => "process_list",
            Category::Streaming => "streaming",
            Category::Memory => "memory",
            Category::Execution => "execution",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debugging session topology, used to scale timeouts and decide which
/// commands are safe to run concurrently with live execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DebuggingMode {
    #[default]
    Local,
    Network,
    VmNetwork,
}

impl DebuggingMode {
    /// Multiplier applied to a category's base timeout for this mode.
    pub fn timeout_multiplier(self) -> f64 {
        match self {
            DebuggingMode::Local => 1.0,
            DebuggingMode::Network => 2.0,
            DebuggingMode::VmNetwork => 3.0,
        }
    }
}

impl fmt::Display for DebuggingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DebuggingMode::Local => "local",
            DebuggingMode::Network => "network",
            DebuggingMode::VmNetwork => "vm_network",
        })
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
