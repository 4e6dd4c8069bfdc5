//! Per-session notification task

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

use crate::capability::CapabilityModel;
use crate::liveview::{JpegFrame, LiveViewEvent};
use crate::telemetry::{OffFrameLayout, TelemetryDecoder};
use crate::types::{CameraEvent, TelemetrySnapshot};

/// Undelivered events held for the consumer.
///
/// Live-view frames beyond this are dropped; the latest frame is always
/// available from the frame watch.
pub(crate) const EVENT_BUFFER: usize = 256;

/// Work queued for the dispatcher, in order of occurrence.
#[derive(Debug)]
pub(crate) enum Dispatch {
    LiveView(LiveViewEvent),
    /// Decode subsequent blocks against this model
    Model(Option<Arc<CapabilityModel>>),
    Event(CameraEvent),
}

/// Receivers for the values the dispatcher owns.
pub(crate) struct DispatcherChannels {
    pub queue: mpsc::UnboundedSender<Dispatch>,
    pub telemetry: watch::Receiver<TelemetrySnapshot>,
    pub frame: watch::Receiver<Option<JpegFrame>>,
}

/// Ordered stream of [`CameraEvent`]s for one session.
///
/// Ends once the session is dropped and every queued event was delivered.
///
/// Buffers a bounded number of undelivered events. When the buffer is full,
/// new [`CameraEvent::LiveViewFrame`]s are dropped and every other event
/// waits for the consumer, so a consumer that stops reading also stalls
/// telemetry decoding.
#[derive(Debug)]
pub struct CameraEvents {
    rx: mpsc::Receiver<CameraEvent>,
}

impl CameraEvents {
    pub async fn recv(&mut self) -> Option<CameraEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CameraEvent> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> ReceiverStream<CameraEvent> {
        ReceiverStream::new(self.rx)
    }
}

/// Single owner of the decoded "current value" state.
///
/// Off-frame blocks are decoded here rather than in the byte path, so
/// change suppression always compares against the last value the consumer
/// was told about.
pub(crate) struct Dispatcher {
    queue: mpsc::UnboundedReceiver<Dispatch>,
    events: mpsc::Sender<CameraEvent>,
    decoder: TelemetryDecoder,
    model: Option<Arc<CapabilityModel>>,
    telemetry: watch::Sender<TelemetrySnapshot>,
    frame: watch::Sender<Option<JpegFrame>>,
}

impl Dispatcher {
    /// Spawn the dispatcher task. Must be called from within a Tokio runtime.
    pub fn spawn(layout: OffFrameLayout) -> (DispatcherChannels, CameraEvents) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySnapshot::default());
        let (frame_tx, frame_rx) = watch::channel(None);

        let dispatcher = Self {
            queue: queue_rx,
            events: events_tx,
            decoder: TelemetryDecoder::new(layout),
            model: None,
            telemetry: telemetry_tx,
            frame: frame_tx,
        };
        tokio::spawn(dispatcher.run());

        (
            DispatcherChannels { queue: queue_tx, telemetry: telemetry_rx, frame: frame_rx },
            CameraEvents { rx: events_rx },
        )
    }

    async fn run(mut self) {
        debug!("Dispatcher started");
        let mut delivered = 0u64;
        let mut dropped_frames = 0u64;

        while let Some(work) = self.queue.recv().await {
            match work {
                Dispatch::LiveView(LiveViewEvent::Frame(frame)) => {
                    trace!(sequence = frame.sequence, len = frame.len(), "Live-view frame");
                    self.frame.send_replace(Some(frame.clone()));
                    match self.events.try_send(CameraEvent::LiveViewFrame(frame)) {
                        Ok(()) => delivered += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            dropped_frames += 1;
                            trace!(dropped_frames, "Event consumer lagging, dropping live-view frame");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => trace!("Event consumer dropped"),
                    }
                }
                Dispatch::LiveView(LiveViewEvent::Metadata(block)) => {
                    let events = self.decoder.decode(block.as_bytes(), self.model.as_deref());
                    if events.is_empty() {
                        continue;
                    }
                    self.telemetry.send_replace(self.decoder.snapshot().clone());
                    for event in events {
                        self.forward(event).await;
                        delivered += 1;
                    }
                }
                Dispatch::Model(model) => {
                    self.model = model;
                    self.decoder.reset();
                    self.telemetry.send_replace(TelemetrySnapshot::default());
                }
                Dispatch::Event(event) => {
                    self.forward(event).await;
                    delivered += 1;
                }
            }
        }

        debug!(delivered, dropped_frames, "Dispatcher stopped");
    }

    async fn forward(&self, event: CameraEvent) {
        if self.events.send(event).await.is_err() {
            trace!("Event consumer dropped");
        }
    }
}
