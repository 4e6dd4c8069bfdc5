//! Live-view byte stream demultiplexing.
//!
//! The camera streams concatenated JPEG images (each delimited by `FF D8` …
//! `FF D9`) with a binary off-frame block between consecutive images. The
//! [`FrameDemuxer`] splits an unbounded feed with arbitrary chunk boundaries
//! into [`LiveViewEvent`]s; [`DemuxExt`] applies it to any chunk stream.
//!
//! ```rust
//! use lumix_remote::liveview::{FrameDemuxer, LiveViewEvent};
//!
//! let mut demuxer = FrameDemuxer::new();
//! let mut stream = vec![0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9];
//! stream.extend(std::iter::repeat(0x00).take(130));
//! stream.extend([0xFF, 0xD8]);
//!
//! let events = demuxer.feed(&stream);
//! assert!(matches!(&events[0], LiveViewEvent::Frame(frame) if frame.len() == 6));
//! assert!(matches!(&events[1], LiveViewEvent::Metadata(block) if block.len() == 130));
//! ```

mod demuxer;
mod stream;

use std::sync::Arc;

pub use demuxer::{FRAME_INITIAL_CAPACITY, FrameDemuxer, MIN_METADATA_LEN};
pub use stream::{Demux, DemuxExt};

/// One complete JPEG image from the live-view stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegFrame {
    /// Per-demuxer sequence number, starting at 0
    pub sequence: u64,
    /// Image bytes including the SOI and EOI markers
    pub data: Arc<[u8]>,
}

impl JpegFrame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Off-frame bytes found between two images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock {
    pub data: Arc<[u8]>,
}

impl MetadataBlock {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Output of the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveViewEvent {
    Frame(JpegFrame),
    Metadata(MetadataBlock),
}
