//! Error types for camera control and live-view processing.
//!
//! All errors implement `std::error::Error` and carry enough context (request
//! path, raw reply body, failing descriptor nodes) to diagnose a misbehaving
//! camera without a packet capture.
//!
//! ## Error Categories
//!
//! - **Transport Errors**: the camera could not be reached or answered with a non-2xx status
//! - **Logical Failures**: a well-formed reply whose `result` is not `ok`
//! - **Parse Errors**: a reply or descriptor tree that does not match the expected shape
//! - **Lookup Errors**: a raw off-frame code with no entry in the capability model
//! - **Session Errors**: operations issued in the wrong session phase
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use lumix_remote::CameraError;
//!
//! let error = CameraError::request_failed("?mode=getstate", 503);
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::SettingCategory;

/// Result type alias for camera operations.
pub type Result<T, E = CameraError> = std::result::Result<T, E>;

/// Main error type for camera operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CameraError {
    #[error("Transport error for request {path}: {reason}")]
    Transport {
        path: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Request failed: {path} (HTTP {status})")]
    RequestFailed { path: String, status: u16 },

    #[error("Not ok result\nRequest: {path}\n{body}")]
    LogicalFailure { path: String, body: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Cannot parse menu descriptor ({} failure(s)): {}", failures.len(), failures.join("; "))]
    DescriptorParse { failures: Vec<String> },

    #[error("No {category} entry for code {code}")]
    CodeNotFound { category: SettingCategory, code: i32 },

    #[error("Status reply for {path} carries no state payload")]
    MissingState { path: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Cannot {operation} while session is {phase}")]
    InvalidPhase { operation: String, phase: String },

    #[error("Camera menu is unavailable (limited mode)")]
    NoCapabilityModel,

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CameraError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CameraError::Transport { .. } => true,
            CameraError::RequestFailed { status, .. } => *status >= 500,
            CameraError::Timeout { .. } => true,
            CameraError::LogicalFailure { .. } => false,
            CameraError::Parse { .. } => false,
            CameraError::DescriptorParse { .. } => false,
            CameraError::CodeNotFound { .. } => false,
            CameraError::MissingState { .. } => true,
            CameraError::InvalidPhase { .. } => false,
            CameraError::NoCapabilityModel => false,
            CameraError::Config { .. } => false,
            CameraError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CameraError::Transport { .. } => vec![
                "Check that the camera is powered on and its Wi-Fi is enabled",
                "Verify the host joined the camera's network",
                "Retry the request",
            ],
            CameraError::RequestFailed { .. } => vec![
                "Verify the camera accepted the pairing request",
                "Check the cgi path in the configuration",
            ],
            CameraError::LogicalFailure { .. } => vec![
                "Check the camera is in a mode that accepts this command",
                "Inspect the reply body for the device error code",
            ],
            CameraError::Parse { .. } => vec![
                "Check the camera firmware version",
                "Capture the raw reply body for analysis",
            ],
            CameraError::DescriptorParse { .. } => vec![
                "Continue in limited mode",
                "Report the camera model and the listed node failures",
            ],
            CameraError::CodeNotFound { .. } => vec![
                "Re-read the current menu",
                "Verify the off-frame layout matches this camera model",
            ],
            CameraError::MissingState { .. } => {
                vec!["Retry the status request", "Check the camera is in remote mode"]
            }
            CameraError::Timeout { .. } => vec![
                "Increase the request timeout",
                "Move closer to the camera",
                "Check network congestion",
            ],
            CameraError::InvalidPhase { .. } => {
                vec!["Create a new session for each connection attempt"]
            }
            CameraError::NoCapabilityModel => {
                vec!["Call read_cur_menu to retry fetching the menu", "Use raw command specs"]
            }
            CameraError::Config { .. } => vec!["Fix the listed configuration value"],
            CameraError::File { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CameraError::Transport { path: path.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        path: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CameraError::Transport { path: path.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for non-success status errors.
    pub fn request_failed(path: impl Into<String>, status: u16) -> Self {
        CameraError::RequestFailed { path: path.into(), status }
    }

    /// Helper constructor for non-`ok` replies.
    pub fn logical_failure(path: impl Into<String>, body: impl Into<String>) -> Self {
        CameraError::LogicalFailure { path: path.into(), body: body.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        CameraError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for phase errors.
    pub fn invalid_phase(operation: impl Into<String>, phase: impl std::fmt::Display) -> Self {
        CameraError::InvalidPhase { operation: operation.into(), phase: phase.to_string() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        CameraError::Config { reason: reason.into() }
    }
}

impl From<quick_xml::DeError> for CameraError {
    fn from(err: quick_xml::DeError) -> Self {
        CameraError::Parse { context: "XML reply".to_string(), details: err.to_string() }
    }
}

impl From<quick_xml::Error> for CameraError {
    fn from(err: quick_xml::Error) -> Self {
        CameraError::Parse { context: "XML document".to_string(), details: err.to_string() }
    }
}

impl From<serde_yaml_ng::Error> for CameraError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        CameraError::Config { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_request_context(
            path in "\\?mode=[a-z]{1,12}(&value=[a-z0-9_]{1,12})?",
            status in 100u16..600u16,
            body in ".*"
          ) {
            let failed = CameraError::request_failed(path.clone(), status);
            let failed_msg = failed.to_string();
            prop_assert!(failed_msg.contains(&path));
            prop_assert!(failed_msg.contains(&status.to_string()));

            let logical = CameraError::logical_failure(path.clone(), body.clone());
            let logical_msg = logical.to_string();
            prop_assert!(logical_msg.contains(&path));
            prop_assert!(logical_msg.contains(&body));
          }

          #[test]
          fn descriptor_failures_are_all_listed(
            failures in prop::collection::vec("[a-z_]{1,16}", 1..8)
          ) {
            let error = CameraError::DescriptorParse { failures: failures.clone() };
            let msg = error.to_string();
            prop_assert!(msg.contains(&failures.len().to_string()));
            for failure in &failures {
              prop_assert!(msg.contains(failure));
            }
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<CameraError>();

        let error = CameraError::transport("?mode=getstate", "connection refused");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(CameraError::transport("?mode=getstate", "reset").is_retryable());
        assert!(CameraError::request_failed("?mode=getstate", 503).is_retryable());
        assert!(!CameraError::request_failed("?mode=getstate", 404).is_retryable());
        assert!(!CameraError::logical_failure("?mode=camcmd&value=capture", "err").is_retryable());
        assert!(
            !CameraError::CodeNotFound { category: SettingCategory::Iso, code: 99999 }
                .is_retryable()
        );
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = vec![
            CameraError::transport("p", "r"),
            CameraError::request_failed("p", 500),
            CameraError::logical_failure("p", "b"),
            CameraError::parse("c", "d"),
            CameraError::DescriptorParse { failures: vec!["x".into()] },
            CameraError::CodeNotFound { category: SettingCategory::Shutter, code: 1 },
            CameraError::MissingState { path: "p".into() },
            CameraError::Timeout { duration: Duration::from_secs(1) },
            CameraError::invalid_phase("connect", "Disconnected"),
            CameraError::NoCapabilityModel,
            CameraError::config("host"),
        ];

        for error in errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error:?}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn transport_source_is_chained() {
        let io = std::io::Error::other("connection reset by peer");
        let error = CameraError::transport_with_source("?mode=getstate", "send", Box::new(io));
        let source = std::error::Error::source(&error).expect("source should be chained");
        assert!(source.to_string().contains("connection reset"));
    }
}
