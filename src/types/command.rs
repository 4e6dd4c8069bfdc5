//! Wire tokens for control commands

use serde::{Deserialize, Serialize};

/// The `mode`, `type` and `value` tokens of one control command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct CommandSpec {
    /// `cmd_mode`, e.g. `setsetting` or `camcmd`
    pub mode: String,
    /// `cmd_type`, e.g. `iso`; empty for commands without a type
    pub command_type: String,
    /// `cmd_value`, e.g. `400`
    pub value: String,
}

impl CommandSpec {
    pub fn new(
        mode: impl Into<String>,
        command_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self { mode: mode.into(), command_type: command_type.into(), value: value.into() }
    }

    /// Query parameters in wire order.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("mode".to_string(), self.mode.clone())];
        if !self.command_type.is_empty() {
            params.push(("type".to_string(), self.command_type.clone()));
        }
        if !self.value.is_empty() {
            params.push(("value".to_string(), self.value.clone()));
        }
        params
    }
}
