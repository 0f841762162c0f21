//! Execution mode.

use serde::{Deserialize, Serialize};

/// What the scanner does with a depth-confirmed opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Hand the opportunity to the execution orchestrator.
    Auto,
    /// Only log it, never place orders.
    #[default]
    AlertOnly,
}

impl ExecutionMode {
    /// Parse a CLI-style name; anything unrecognised is alert-only.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "auto" | "live" => ExecutionMode::Auto,
            _ => ExecutionMode::AlertOnly,
        }
    }

    pub fn places_orders(self) -> bool {
        matches!(self, ExecutionMode::Auto)
    }
}
