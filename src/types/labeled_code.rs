//! Decoded setting values

use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded setting value: the text shown to the user plus the raw device code.
///
/// Equality is structural, which is what change suppression compares against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct LabeledCode {
    /// Display text (localized label or raw device value)
    pub text: String,
    /// Raw code as found in off-frame bytes
    pub code: i32,
}

impl LabeledCode {
    /// Text of the error sentinel.
    pub const ERROR_TEXT: &'static str = "!";
    /// Code of the error sentinel.
    pub const ERROR_CODE: i32 = -1;

    pub fn new(text: impl Into<String>, code: i32) -> Self {
        Self { text: text.into(), code }
    }

    /// Sentinel substituted when a raw code cannot be decoded.
    pub fn error() -> Self {
        Self::new(Self::ERROR_TEXT, Self::ERROR_CODE)
    }

    pub fn is_error(&self) -> bool {
        self.code == Self::ERROR_CODE && self.text == Self::ERROR_TEXT
    }
}

impl fmt::Display for LabeledCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
