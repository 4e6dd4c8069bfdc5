//! Byte-level frame/off-frame splitter

use std::sync::Arc;
use tracing::trace;

use super::{JpegFrame, LiveViewEvent, MetadataBlock};

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;

/// Initial capacity of a frame buffer; grows as needed.
pub const FRAME_INITIAL_CAPACITY: usize = 32 * 1024;

/// Off-frame blocks shorter than this are discarded.
pub const MIN_METADATA_LEN: usize = 130;

/// Stateful live-view stream parser.
///
/// Processes one byte at a time with one byte of history, so the output is
/// independent of how the feed is split into chunks. At most one of the
/// frame and metadata buffers is active at any time.
///
/// Marker pairs inside JPEG entropy-coded data are not detected; the device's
/// encoder is trusted not to produce `FF D8`/`FF D9` except at image
/// boundaries.
#[derive(Debug)]
pub struct FrameDemuxer {
    frame: Option<Vec<u8>>,
    metadata: Option<Vec<u8>>,
    last_byte: u8,
    next_sequence: u64,
}

impl Default for FrameDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDemuxer {
    pub fn new() -> Self {
        Self { frame: None, metadata: None, last_byte: 0, next_sequence: 0 }
    }

    /// Clear both buffers and the previous byte.
    ///
    /// Used after a transport restart; the frame sequence keeps counting.
    pub fn reset(&mut self) {
        self.frame = None;
        self.metadata = None;
        self.last_byte = 0;
    }

    /// Process a chunk, handing every completed frame or block to `emit` in order.
    pub fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(LiveViewEvent)) {
        trace!(len = chunk.len(), "Demuxing live-view chunk");
        for &byte in chunk {
            self.push_byte(byte, &mut emit);
        }
    }

    /// Process a chunk and collect the completed events.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<LiveViewEvent> {
        let mut events = Vec::new();
        self.push(chunk, |event| events.push(event));
        events
    }

    pub fn is_in_frame(&self) -> bool {
        self.frame.is_some()
    }

    pub fn is_in_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Number of frames emitted since construction.
    pub fn frames_emitted(&self) -> u64 {
        self.next_sequence
    }

    fn push_byte(&mut self, byte: u8, emit: &mut impl FnMut(LiveViewEvent)) {
        if let Some(frame) = self.frame.as_mut() {
            frame.push(byte);
        }
        if let Some(metadata) = self.metadata.as_mut() {
            metadata.push(byte);
        }

        if self.last_byte == MARKER {
            if byte == SOI {
                self.flush_metadata(emit);
                if self.frame.is_some() {
                    trace!("Start of image inside an open frame, dropping partial frame");
                }
                let mut frame = Vec::with_capacity(FRAME_INITIAL_CAPACITY);
                frame.extend_from_slice(&[MARKER, SOI]);
                self.frame = Some(frame);
            } else if byte == EOI {
                if let Some(frame) = self.frame.take() {
                    let sequence = self.next_sequence;
                    self.next_sequence += 1;
                    emit(LiveViewEvent::Frame(JpegFrame { sequence, data: frame.into() }));
                    self.metadata = Some(Vec::new());
                }
            }
        }

        self.last_byte = byte;
    }

    fn flush_metadata(&mut self, emit: &mut impl FnMut(LiveViewEvent)) {
        let Some(mut metadata) = self.metadata.take() else {
            return;
        };

        // The SOI marker pair that closed the block was appended above.
        metadata.truncate(metadata.len().saturating_sub(2));

        if metadata.len() >= MIN_METADATA_LEN {
            emit(LiveViewEvent::Metadata(MetadataBlock { data: Arc::from(metadata) }));
        } else {
            trace!(len = metadata.len(), "Discarding short off-frame block");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn feed_chunks(chunks: &[&[u8]]) -> Vec<LiveViewEvent> {
        let mut demuxer = FrameDemuxer::new();
        chunks.iter().flat_map(|chunk| demuxer.feed(chunk)).collect()
    }

    #[test]
    fn frame_then_metadata_then_partial_frame() {
        let image: Vec<u8> = (0..200u32).map(|i| (i % 0xF0) as u8).collect();
        let metadata = vec![0x11u8; 130];

        let mut stream = jpeg(&image);
        stream.extend_from_slice(&metadata);
        stream.extend_from_slice(&[0xFF, 0xD8, 0x01, 0x02, 0x03]);

        let events = FrameDemuxer::new().feed(&stream);
        assert_eq!(events.len(), 2);

        match &events[0] {
            LiveViewEvent::Frame(frame) => {
                assert_eq!(frame.len(), image.len() + 4);
                assert_eq!(frame.sequence, 0);
                assert_eq!(&frame.data[..2], &[0xFF, 0xD8]);
                assert_eq!(&frame.data[frame.len() - 2..], &[0xFF, 0xD9]);
            }
            other => panic!("expected frame, got {other:?}"),
        }
        match &events[1] {
            LiveViewEvent::Metadata(block) => {
                assert_eq!(block.len(), 130);
                assert_eq!(block.as_bytes(), metadata.as_slice());
            }
            other => panic!("expected metadata, got {other:?}"),
        }
    }

    #[test]
    fn short_metadata_is_discarded() {
        let mut stream = jpeg(&[0x01]);
        stream.extend_from_slice(&[0x22; 129]);
        stream.extend_from_slice(&jpeg(&[0x02]));

        let events = FrameDemuxer::new().feed(&stream);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| matches!(event, LiveViewEvent::Frame(_))));
    }

    #[test]
    fn eoi_without_open_frame_is_ignored() {
        let events = FrameDemuxer::new().feed(&[0x00, 0xFF, 0xD9, 0x10]);
        assert!(events.is_empty());
    }

    #[test]
    fn leading_garbage_before_first_frame_is_not_metadata() {
        let mut stream = vec![0x33; 500];
        stream.extend_from_slice(&jpeg(&[0x01]));
        let events = FrameDemuxer::new().feed(&stream);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LiveViewEvent::Frame(_)));
    }

    #[test]
    fn only_one_buffer_active_at_a_time() {
        let mut demuxer = FrameDemuxer::new();
        assert!(!demuxer.is_in_frame() && !demuxer.is_in_metadata());

        demuxer.feed(&[0xFF, 0xD8, 0x01]);
        assert!(demuxer.is_in_frame() && !demuxer.is_in_metadata());

        demuxer.feed(&[0xFF, 0xD9]);
        assert!(!demuxer.is_in_frame() && demuxer.is_in_metadata());

        demuxer.feed(&[0x00, 0xFF, 0xD8]);
        assert!(demuxer.is_in_frame() && !demuxer.is_in_metadata());
    }

    #[test]
    fn marker_split_across_chunks() {
        let mut demuxer = FrameDemuxer::new();
        assert!(demuxer.feed(&[0xFF]).is_empty());
        assert!(demuxer.feed(&[0xD8, 0x05, 0xFF]).is_empty());
        let events = demuxer.feed(&[0xD9]);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LiveViewEvent::Frame(frame) if frame.len() == 5));
    }

    #[test]
    fn reset_drops_partial_state() {
        let mut demuxer = FrameDemuxer::new();
        demuxer.feed(&[0xFF, 0xD8, 0x01, 0x02, 0xFF]);
        demuxer.reset();
        assert!(!demuxer.is_in_frame());

        // The pending 0xFF was forgotten, so this D9 does not close anything.
        assert!(demuxer.feed(&[0xD9]).is_empty());
        let events = demuxer.feed(&jpeg(&[0x07]));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn sequence_numbers_increase() {
        let mut stream = jpeg(&[0x01]);
        stream.extend_from_slice(&jpeg(&[0x02]));
        stream.extend_from_slice(&jpeg(&[0x03]));
        let sequences: Vec<u64> = FrameDemuxer::new()
            .feed(&stream)
            .into_iter()
            .filter_map(|event| match event {
                LiveViewEvent::Frame(frame) => Some(frame.sequence),
                LiveViewEvent::Metadata(_) => None,
            })
            .collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    fn arb_live_view_stream() -> impl Strategy<Value = Vec<u8>> {
        let payload = prop::collection::vec(0u8..0xFF, 0..64);
        let segment = (payload, prop::collection::vec(any::<u8>(), 0..200));
        prop::collection::vec(segment, 1..6).prop_map(|segments| {
            let mut stream = Vec::new();
            for (image, off_frame) in segments {
                stream.extend_from_slice(&jpeg(&image));
                stream.extend_from_slice(&off_frame);
            }
            stream
        })
    }

    proptest! {
        #[test]
        fn chunk_boundaries_do_not_change_output(
            stream in arb_live_view_stream(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12)
        ) {
            let whole = FrameDemuxer::new().feed(&stream);

            let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(stream.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut chunks: Vec<&[u8]> = Vec::new();
            let mut start = 0;
            for point in points {
                chunks.push(&stream[start..point]);
                start = point;
            }
            chunks.push(&stream[start..]);

            prop_assert_eq!(feed_chunks(&chunks), whole);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
            let mut demuxer = FrameDemuxer::new();
            for event in demuxer.feed(&bytes) {
                match event {
                    LiveViewEvent::Frame(frame) => {
                        prop_assert!(frame.len() >= 4);
                        prop_assert_eq!(&frame.data[..2], &[0xFF, 0xD8]);
                    }
                    LiveViewEvent::Metadata(block) => prop_assert!(block.len() >= MIN_METADATA_LEN),
                }
            }
        }
    }
}
