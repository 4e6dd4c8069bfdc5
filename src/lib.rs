//! Async client driver for the Lumix camera remote-control protocol.
//!
//! Lumix Remote speaks the camera's HTTP/XML command interface and splits
//! its live-view byte stream into JPEG frames and the exposure telemetry
//! carried between them.
//!
//! # Features
//!
//! - **Live View**: chunk-boundary independent JPEG/off-frame demultiplexing
//! - **Capability Model**: per-device decode/encode tables built from the camera's menu
//! - **Telemetry**: ISO, shutter, aperture and mode decoded from off-frame bytes
//! - **Session**: connect, polling, recording control and clean disconnect
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lumix_remote::{CameraConfig, CameraEvent, Lumix};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (camera, mut events) = Lumix::connect(CameraConfig::new("192.168.54.1")).await?;
//!     camera.capture().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let CameraEvent::IsoChanged(iso) = event {
//!             println!("ISO {iso}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Protocol engine
pub mod capability;
pub mod gateway;
pub mod liveview;
pub mod session;
pub mod telemetry;

// Core exports
pub use error::*;
pub use types::*;

pub use capability::{CapabilityModel, DescriptorNode};
pub use config::CameraConfig;
pub use gateway::{CommandGateway, HttpTransport, Transport, TransportResponse};
pub use liveview::{DemuxExt, FrameDemuxer, JpegFrame, LiveViewEvent, MetadataBlock};
pub use session::{Camera, CameraEvents, PollOutcome, SessionPhase};
pub use telemetry::{OffFrameLayout, TelemetryDecoder};

/// Entry point for camera sessions over HTTP.
///
/// # Examples
///
/// ```rust,no_run
/// use lumix_remote::{CameraConfig, Lumix};
///
/// #[tokio::main]
/// async fn main() -> lumix_remote::Result<()> {
///     let (camera, _events) = Lumix::connect(CameraConfig::new("192.168.54.1")).await?;
///     camera.rec_start().await?;
///     Ok(())
/// }
/// ```
pub struct Lumix;

impl Lumix {
    /// Connect to the camera described by `config`.
    ///
    /// Streams live view to `config.liveview_port` and labels values in
    /// `config.language`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The camera cannot be reached
    /// - The camera rejects the record-mode or stream request
    pub async fn connect(config: CameraConfig) -> Result<(Camera, CameraEvents)> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        let liveview_port = config.liveview_port;
        let language = config.language.clone();

        let (camera, events) = Camera::new(transport, config);
        camera.connect(liveview_port, &language).await?;
        Ok((camera, events))
    }

    /// Load a YAML configuration file and connect.
    ///
    /// ```rust,no_run
    /// use lumix_remote::Lumix;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> lumix_remote::Result<()> {
    /// let (camera, _events) = Lumix::open("lumix.yaml").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open<P: AsRef<std::path::Path>>(path: P) -> Result<(Camera, CameraEvents)> {
        Self::connect(CameraConfig::from_path(path)?).await
    }
}
