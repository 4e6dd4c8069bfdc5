//! Session configuration.
//!
//! All fields have defaults matching the camera's factory behaviour, so a
//! config usually only names the host:
//!
//! ```rust
//! use lumix_remote::CameraConfig;
//!
//! let config = CameraConfig::from_yaml_str("host: 192.168.54.1\nlanguage: de\n")?;
//! assert_eq!(config.base_url(), "http://192.168.54.1/cam.cgi");
//! assert_eq!(config.poll_interval().as_secs(), 2);
//! # Ok::<(), lumix_remote::CameraError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::telemetry::OffFrameLayout;
use crate::{CameraError, Result};

/// Connection and polling parameters for one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera host or IP address
    pub host: String,
    /// Command endpoint path
    pub cgi_path: String,
    /// Two-letter language code for menu labels
    pub language: String,
    /// Local UDP port the camera streams live view to
    pub liveview_port: u16,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Upper bound on the best-effort stop-stream call during disconnect
    pub stop_stream_timeout_ms: u64,
    pub layout: OffFrameLayout,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            host: "192.168.54.1".to_string(),
            cgi_path: "/cam.cgi".to_string(),
            language: "en".to_string(),
            liveview_port: 49152,
            poll_interval_ms: 2000,
            request_timeout_ms: 5000,
            stop_stream_timeout_ms: 2000,
            layout: OffFrameLayout::default(),
        }
    }
}

impl CameraConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), ..Self::default() }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: CameraConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|source| CameraError::File { path: path.to_path_buf(), source })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(CameraError::config("host must not be empty"));
        }
        if !self.cgi_path.starts_with('/') {
            return Err(CameraError::config(format!(
                "cgi_path '{}' must start with '/'",
                self.cgi_path
            )));
        }
        if self.language.trim().is_empty() {
            return Err(CameraError::config("language must not be empty"));
        }
        for (name, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("stop_stream_timeout_ms", self.stop_stream_timeout_ms),
        ] {
            if value == 0 {
                return Err(CameraError::config(format!("{name} must be greater than zero")));
            }
        }
        self.layout.validate()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.host, self.cgi_path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn stop_stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_stream_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{FieldKind, FieldLocation};

    #[test]
    fn defaults_are_valid() {
        let config = CameraConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.base_url(), "http://192.168.54.1/cam.cgi");
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let yaml = "
host: 10.0.0.7
poll_interval_ms: 500
layout:
  iso:
    offset: 120
    kind: u16_be
";
        let config = CameraConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.layout.iso, FieldLocation::new(120, FieldKind::U16Be));
        assert_eq!(config.layout.mode, OffFrameLayout::default().mode);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            CameraConfig::from_yaml_str("host: ''"),
            Err(CameraError::Config { .. })
        ));
        assert!(matches!(
            CameraConfig::from_yaml_str("poll_interval_ms: 0"),
            Err(CameraError::Config { .. })
        ));
        assert!(matches!(
            CameraConfig::from_yaml_str("cgi_path: cam.cgi"),
            Err(CameraError::Config { .. })
        ));
        assert!(matches!(
            CameraConfig::from_yaml_str("layout:\n  mode:\n    offset: 200\n    kind: u8\n"),
            Err(CameraError::Config { .. })
        ));
    }

    #[test]
    fn overflowing_layout_offset_is_rejected() {
        let yaml = "layout:\n  mode:\n    offset: 18446744073709551615\n    kind: u8\n";
        assert!(matches!(CameraConfig::from_yaml_str(yaml), Err(CameraError::Config { .. })));
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        assert!(matches!(
            CameraConfig::from_yaml_str("poll_interval_ms: [1, 2"),
            Err(CameraError::Config { .. })
        ));
    }

    #[test]
    fn missing_file_is_file_error() {
        let err = CameraConfig::from_path("/nonexistent/lumix.yaml").unwrap_err();
        assert!(matches!(err, CameraError::File { .. }));
    }
}
