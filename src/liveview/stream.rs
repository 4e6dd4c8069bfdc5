//! Stream adapter from raw chunks to live-view events

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::{FrameDemuxer, LiveViewEvent};

/// Extension trait to demultiplex any stream of byte chunks.
pub trait DemuxExt: Stream {
    /// Split the chunks into frames and off-frame blocks.
    ///
    /// Chunk boundaries are irrelevant; a chunk may complete several events
    /// or none.
    fn demux(self) -> Demux<Self>
    where
        Self: Sized,
    {
        Demux::new(self)
    }
}

impl<T: Stream> DemuxExt for T {}

pin_project! {
    /// A stream combinator yielding [`LiveViewEvent`]s from byte chunks
    pub struct Demux<S> {
        #[pin]
        stream: S,
        demuxer: FrameDemuxer,
        pending: VecDeque<LiveViewEvent>,
    }
}

impl<S> Demux<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, demuxer: FrameDemuxer::new(), pending: VecDeque::new() }
    }

    pub fn demuxer(&self) -> &FrameDemuxer {
        &self.demuxer
    }
}

impl<S, B> Stream for Demux<S>
where
    S: Stream<Item = B>,
    B: AsRef<[u8]>,
{
    type Item = LiveViewEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(chunk) => {
                    let pending = &mut *this.pending;
                    this.demuxer.push(chunk.as_ref(), |event| pending.push_back(event));
                }
                // A trailing partial frame or block is never emitted.
                None => return Poll::Ready(None),
            }
        }
    }
}
