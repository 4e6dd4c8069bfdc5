//! Camera session: connect, poll, record and disconnect.
//!
//! A [`Camera`] owns one connection attempt. It drives the
//! [`CommandGateway`] and the [`CapabilityModel`] during connect and
//! polling, accepts live-view bytes through [`Camera::process_chunk`], and
//! reports every observable change as an ordered [`CameraEvent`] on the
//! [`CameraEvents`] returned alongside it.
//!
//! ```rust,no_run
//! use lumix_remote::{Camera, CameraConfig, HttpTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> lumix_remote::Result<()> {
//! let config = CameraConfig::new("192.168.54.1");
//! let transport = HttpTransport::new(&config)?;
//! let (camera, mut events) = Camera::new(transport, config);
//!
//! camera.connect(49152, "en").await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod dispatcher;

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::capability::CapabilityModel;
use crate::config::CameraConfig;
use crate::gateway::{BaseReply, CommandGateway, HttpTransport, StateReply, Transport};
use crate::liveview::{FrameDemuxer, JpegFrame};
use crate::types::{
    CameraEvent, CameraMode, CameraState, CommandSpec, LabeledCode, RecState, SettingCategory,
    TelemetrySnapshot,
};
use crate::{CameraError, Result};

use dispatcher::{Dispatch, Dispatcher};

pub use dispatcher::CameraEvents;

const QUERY_ALLMENU: &str = "?mode=getinfo&type=allmenu";
const QUERY_CURMENU: &str = "?mode=getinfo&type=curmenu";
const QUERY_RECMODE: &str = "?mode=camcmd&value=recmode";
const QUERY_GETSTATE: &str = "?mode=getstate";
const QUERY_STOPSTREAM: &str = "?mode=stopstream";
const QUERY_CAPTURE: &str = "?mode=camcmd&value=capture";
const QUERY_CAPTURE_CANCEL: &str = "?mode=camcmd&value=capture_cancel";
const QUERY_REC_START: &str = "?mode=camcmd&value=video_recstart";
const QUERY_REC_STOP: &str = "?mode=camcmd&value=video_recstop";

/// Lifecycle phase of a session. `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Connected => "connected",
            SessionPhase::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// What one poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll held the gate
    Skipped,
    /// Session is not connecting or connected
    NotConnected,
    Updated,
    /// The poll failed and the session was disconnected
    Disconnected,
}

struct Inner<T> {
    gateway: CommandGateway<T>,
    config: CameraConfig,
    language: Mutex<String>,
    phase: watch::Sender<SessionPhase>,
    connected: watch::Sender<bool>,
    model: watch::Sender<Option<Arc<CapabilityModel>>>,
    state: watch::Sender<Option<Arc<CameraState>>>,
    rec_state: watch::Sender<RecState>,
    telemetry: watch::Receiver<TelemetrySnapshot>,
    frame: watch::Receiver<Option<JpegFrame>>,
    demuxer: Mutex<FrameDemuxer>,
    poll_gate: Semaphore,
    queue: mpsc::UnboundedSender<Dispatch>,
    cancel: CancellationToken,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One camera session.
///
/// Cheap to clone; clones share the session. Polling stops once every clone
/// is dropped or the session disconnects.
pub struct Camera<T: Transport = HttpTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Camera<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Transport> fmt::Debug for Camera<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("host", &self.inner.config.host)
            .field("phase", &self.phase())
            .field("limited", &self.is_limited())
            .finish()
    }
}

impl<T: Transport> Camera<T> {
    /// Create an idle session. Must be called from within a Tokio runtime.
    pub fn new(transport: T, config: CameraConfig) -> (Self, CameraEvents) {
        let (channels, events) = Dispatcher::spawn(config.layout);

        let inner = Inner {
            gateway: CommandGateway::new(Arc::new(transport)),
            language: Mutex::new(config.language.clone()),
            config,
            phase: watch::Sender::new(SessionPhase::Idle),
            connected: watch::Sender::new(false),
            model: watch::Sender::new(None),
            state: watch::Sender::new(None),
            rec_state: watch::Sender::new(RecState::Unknown),
            telemetry: channels.telemetry,
            frame: channels.frame,
            demuxer: Mutex::new(FrameDemuxer::new()),
            poll_gate: Semaphore::new(1),
            queue: channels.queue,
            cancel: CancellationToken::new(),
        };

        (Self { inner: Arc::new(inner) }, events)
    }

    pub fn gateway(&self) -> &CommandGateway<T> {
        &self.inner.gateway
    }

    pub fn config(&self) -> &CameraConfig {
        &self.inner.config
    }

    /// Connect to the camera and start polling.
    ///
    /// Fetches the menu descriptor (an unusable descriptor leaves the session
    /// in limited mode), switches the camera to record mode, polls the state
    /// once, starts periodic polling and asks the camera to stream live view
    /// to `liveview_port`. On failure the session is disconnected and the
    /// error returned.
    ///
    /// An invalid [`CameraConfig`] is rejected before any request is sent and
    /// leaves the session idle.
    pub async fn connect(&self, liveview_port: u16, language: &str) -> Result<()> {
        if let Err(err) = self.inner.config.validate() {
            error!(error = %err, "Refusing to connect with invalid configuration");
            return Err(err);
        }

        let started = self.inner.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Idle {
                *phase = SessionPhase::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(CameraError::invalid_phase("connect", self.phase()));
        }

        info!(host = %self.inner.config.host, liveview_port, language, "Connecting to camera");
        *lock(&self.inner.language) = language.to_string();

        match self.run_connect(liveview_port, language).await {
            Ok(()) => {
                info!(limited = self.is_limited(), "Camera connected");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Camera connect failed");
                self.disconnect().await;
                Err(err)
            }
        }
    }

    async fn run_connect(&self, liveview_port: u16, language: &str) -> Result<()> {
        self.manager_restarted();

        let model = self.load_model(language).await?;
        self.replace_model(model);

        self.switch_to_rec().await?;
        self.update_state().await?;
        self.start_polling();

        self.inner
            .gateway
            .get::<BaseReply>(format!("?mode=startstream&value={liveview_port}"))
            .await?;

        // The connected flag and its event are published under the phase lock,
        // so a concurrent disconnect always observes and clears them.
        let promoted = self.inner.phase.send_if_modified(|phase| {
            if *phase != SessionPhase::Connecting {
                return false;
            }
            *phase = SessionPhase::Connected;
            self.inner.connected.send_replace(true);
            self.emit(CameraEvent::ConnectionChanged(true));
            true
        });
        if !promoted {
            return Err(CameraError::invalid_phase("complete connect", self.phase()));
        }
        Ok(())
    }

    /// Fetch and build the capability model; `None` means limited mode.
    ///
    /// Connectivity failures abort connect; anything wrong with the
    /// descriptor itself only degrades the session.
    async fn load_model(&self, language: &str) -> Result<Option<Arc<CapabilityModel>>> {
        let tree = match self.inner.gateway.get_descriptor(QUERY_ALLMENU).await {
            Ok(tree) => tree,
            Err(
                err @ (CameraError::Transport { .. }
                | CameraError::RequestFailed { .. }
                | CameraError::Timeout { .. }),
            ) => return Err(err),
            Err(err) => {
                warn!(error = %err, "Menu descriptor unavailable, continuing in limited mode");
                return Ok(None);
            }
        };

        match CapabilityModel::build(&tree, language) {
            Ok(model) => Ok(Some(Arc::new(model))),
            Err(err) => {
                warn!(error = %err, "Menu descriptor rejected, continuing in limited mode");
                Ok(None)
            }
        }
    }

    /// Install `model`. A disconnected session only accepts `None`.
    fn replace_model(&self, model: Option<Arc<CapabilityModel>>) {
        self.inner.phase.send_if_modified(|phase| {
            if model.is_none() || *phase != SessionPhase::Disconnected {
                self.inner.model.send_replace(model.clone());
                self.dispatch(Dispatch::Model(model));
            } else {
                debug!("Session disconnected, discarding capability model");
            }
            false
        });
    }

    fn start_polling(&self) {
        let session = Arc::downgrade(&self.inner);
        let period = self.inner.config.poll_interval();
        let cancel = self.inner.cancel.child_token();
        tokio::spawn(poll_loop(session, period, cancel));
    }

    /// End the session.
    ///
    /// Safe to call at any time and from several tasks at once: the first
    /// caller performs the shutdown and returns `true`, later callers return
    /// `false` immediately. Never fails; a failed stop-stream request is
    /// reported as `still_available: false`.
    pub async fn disconnect(&self) -> bool {
        let first = self.inner.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Disconnected {
                false
            } else {
                *phase = SessionPhase::Disconnected;
                true
            }
        });
        if !first {
            trace!("Session already disconnected");
            return false;
        }

        self.inner.cancel.cancel();

        let timeout = self.inner.config.stop_stream_timeout();
        let stop = self.inner.gateway.get::<BaseReply>(QUERY_STOPSTREAM);
        let still_available = match tokio::time::timeout(timeout, stop).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "Stop-stream request failed");
                false
            }
            Err(_) => {
                warn!(?timeout, "Stop-stream request timed out");
                false
            }
        };

        self.replace_model(None);
        self.emit(CameraEvent::Disconnected { still_available });
        self.inner.connected.send_replace(false);
        self.emit(CameraEvent::ConnectionChanged(false));

        info!(still_available, "Camera disconnected");
        true
    }

    /// Fetch the device state.
    ///
    /// Returns the current snapshot unchanged, without notifying, when the
    /// camera reports exactly what was seen last.
    pub async fn update_state(&self) -> Result<Arc<CameraState>> {
        let reply: StateReply = self.inner.gateway.get(QUERY_GETSTATE).await?;
        let fresh = Arc::new(
            reply
                .state
                .ok_or_else(|| CameraError::MissingState { path: QUERY_GETSTATE.to_string() })?,
        );

        let mut existing = None;
        let changed = self.inner.state.send_if_modified(|current| {
            if let Some(current) = current.as_ref().filter(|current| **current == fresh) {
                existing = Some(Arc::clone(current));
                return false;
            }
            *current = Some(Arc::clone(&fresh));
            true
        });

        if !changed {
            trace!("Camera state unchanged");
            return Ok(existing.unwrap_or(fresh));
        }

        debug!(rec = ?fresh.rec, cammode = ?fresh.cammode, batt = ?fresh.batt, "Camera state changed");
        if !self.emit_live(CameraEvent::StateChanged(Arc::clone(&fresh))) {
            debug!("Session disconnected during state poll, dropping state change");
            return Ok(fresh);
        }
        self.set_rec_state(RecState::from_recording(fresh.is_recording()));
        Ok(fresh)
    }

    /// Run one poll cycle.
    ///
    /// Skipped when another poll is still in flight. A failed poll
    /// disconnects the session instead of returning the error.
    pub async fn poll_tick(&self) -> PollOutcome {
        let Ok(_permit) = self.inner.poll_gate.try_acquire() else {
            debug!("Poll still in flight, skipping tick");
            return PollOutcome::Skipped;
        };

        if !matches!(self.phase(), SessionPhase::Connecting | SessionPhase::Connected) {
            return PollOutcome::NotConnected;
        }

        match self.update_state().await {
            Ok(_) => PollOutcome::Updated,
            Err(err) => {
                warn!(error = %err, "State poll failed, disconnecting");
                self.disconnect().await;
                PollOutcome::Disconnected
            }
        }
    }

    /// Start video recording. The recording state becomes unknown until the next poll.
    pub async fn rec_start(&self) -> Result<()> {
        self.inner.gateway.get::<BaseReply>(QUERY_REC_START).await?;
        self.set_rec_state(RecState::Unknown);
        Ok(())
    }

    /// Stop video recording. The recording state becomes unknown until the next poll.
    pub async fn rec_stop(&self) -> Result<()> {
        self.inner.gateway.get::<BaseReply>(QUERY_REC_STOP).await?;
        self.set_rec_state(RecState::Unknown);
        Ok(())
    }

    /// Take a still photo.
    pub async fn capture(&self) -> Result<()> {
        self.inner.gateway.get::<BaseReply>(QUERY_CAPTURE).await?;
        self.inner.gateway.get::<BaseReply>(QUERY_CAPTURE_CANCEL).await?;
        Ok(())
    }

    /// Put the camera into record (remote shooting) mode.
    pub async fn switch_to_rec(&self) -> Result<()> {
        self.inner.gateway.get::<BaseReply>(QUERY_RECMODE).await?;
        Ok(())
    }

    pub async fn send_menu_item(&self, command: &CommandSpec) -> Result<()> {
        debug!(mode = %command.mode, command_type = %command.command_type, value = %command.value, "Sending menu item");
        self.inner.gateway.get::<BaseReply>(command).await?;
        Ok(())
    }

    /// Set `category` to the value the camera reports as `code`.
    pub async fn set_value(&self, category: SettingCategory, code: i32) -> Result<()> {
        let model = self.capability_model().ok_or(CameraError::NoCapabilityModel)?;
        let command = model.encode(category, code)?.clone();
        self.send_menu_item(&command).await
    }

    /// Re-read the current menu and replace the capability model.
    ///
    /// The recording state becomes unknown, since the menu change may have
    /// switched the camera between photo and video.
    pub async fn read_cur_menu(&self) -> Result<Arc<CapabilityModel>> {
        let tree = self.inner.gateway.get_descriptor(QUERY_CURMENU).await?;
        let language = lock(&self.inner.language).clone();
        let model = Arc::new(CapabilityModel::build(&tree, &language)?);
        self.replace_model(Some(Arc::clone(&model)));
        self.set_rec_state(RecState::Unknown);
        Ok(model)
    }

    /// Feed live-view bytes as received from the network.
    pub fn process_chunk(&self, chunk: &[u8]) {
        let mut demuxer = lock(&self.inner.demuxer);
        demuxer.push(chunk, |event| {
            if self.inner.queue.send(Dispatch::LiveView(event)).is_err() {
                trace!("Dispatcher stopped, dropping live-view event");
            }
        });
    }

    /// Drop partial live-view data after the byte transport restarted.
    pub fn manager_restarted(&self) {
        debug!("Resetting live-view demuxer");
        lock(&self.inner.demuxer).reset();
    }

    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.borrow()
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.connected.borrow()
    }

    /// Connected without a capability model.
    pub fn is_limited(&self) -> bool {
        self.phase() == SessionPhase::Connected && self.inner.model.borrow().is_none()
    }

    pub fn capability_model(&self) -> Option<Arc<CapabilityModel>> {
        self.inner.model.borrow().clone()
    }

    pub fn state(&self) -> Option<Arc<CameraState>> {
        self.inner.state.borrow().clone()
    }

    pub fn rec_state(&self) -> RecState {
        *self.inner.rec_state.borrow()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.inner.telemetry.borrow().clone()
    }

    pub fn current_iso(&self) -> Option<LabeledCode> {
        self.inner.telemetry.borrow().iso.clone()
    }

    pub fn current_shutter(&self) -> Option<LabeledCode> {
        self.inner.telemetry.borrow().shutter.clone()
    }

    pub fn current_aperture(&self) -> Option<LabeledCode> {
        self.inner.telemetry.borrow().aperture.clone()
    }

    pub fn current_mode(&self) -> CameraMode {
        self.inner.telemetry.borrow().mode
    }

    pub fn can_change_aperture(&self) -> bool {
        self.inner.telemetry.borrow().can_change_aperture
    }

    pub fn can_change_shutter(&self) -> bool {
        self.inner.telemetry.borrow().can_change_shutter
    }

    /// Most recent complete live-view frame.
    pub fn live_view_frame(&self) -> Option<JpegFrame> {
        self.inner.frame.borrow().clone()
    }

    /// Current telemetry followed by every change.
    pub fn telemetry_updates(&self) -> WatchStream<TelemetrySnapshot> {
        WatchStream::new(self.inner.telemetry.clone())
    }

    /// Current phase followed by every transition.
    pub fn phase_updates(&self) -> WatchStream<SessionPhase> {
        WatchStream::new(self.inner.phase.subscribe())
    }

    fn set_rec_state(&self, rec_state: RecState) {
        let changed = self.inner.rec_state.send_if_modified(|current| {
            if *current == rec_state {
                false
            } else {
                *current = rec_state;
                true
            }
        });
        if changed {
            debug!(?rec_state, "Recording state changed");
            self.emit_live(CameraEvent::RecStateChanged(rec_state));
        }
    }

    /// Queue `event` unless the session has disconnected.
    ///
    /// Checked under the phase lock, so nothing is queued after the
    /// `Disconnected` notification.
    fn emit_live(&self, event: CameraEvent) -> bool {
        let mut sent = false;
        self.inner.phase.send_if_modified(|phase| {
            if *phase != SessionPhase::Disconnected {
                self.emit(event);
                sent = true;
            }
            false
        });
        sent
    }

    fn emit(&self, event: CameraEvent) {
        self.dispatch(Dispatch::Event(event));
    }

    fn dispatch(&self, work: Dispatch) {
        if self.inner.queue.send(work).is_err() {
            trace!("Dispatcher stopped, dropping notification");
        }
    }
}

async fn poll_loop<T: Transport>(
    session: Weak<Inner<T>>,
    period: Duration,
    cancel: CancellationToken,
) {
    debug!(?period, "Polling started");
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = session.upgrade() else {
            break;
        };
        let camera = Camera { inner };
        tokio::spawn(async move {
            let outcome = camera.poll_tick().await;
            trace!(?outcome, "Poll tick finished");
        });
    }

    debug!("Polling stopped");
}
