//! Test utilities: a scripted transport and canned camera replies.
//!
//! Compiled for unit tests and for the `benchmark` feature so benches can
//! build realistic live-view streams without a camera.

#![cfg(any(test, feature = "benchmark"))]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::gateway::{Transport, TransportResponse};
use crate::liveview::MIN_METADATA_LEN;
use crate::telemetry::OffFrameLayout;
use crate::{CameraError, Result};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(TransportResponse),
    Fail,
}

#[derive(Debug)]
struct Gate {
    query: String,
    armed: bool,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

/// In-memory [`Transport`] answering from a per-query script.
///
/// Queries with no scripted answer get HTTP 404. Every request is recorded
/// in arrival order.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<String>>,
    gate: Mutex<Option<Gate>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with HTTP 200 and `body` until re-scripted.
    pub fn respond(&self, query: &str, body: impl Into<String>) {
        self.respond_status(query, 200, body);
    }

    pub fn respond_status(&self, query: &str, status: u16, body: impl Into<String>) {
        let response = TransportResponse { status, body: body.into() };
        lock(&self.script).insert(query.to_string(), Scripted::Reply(response));
    }

    /// Fail `query` with a connectivity error.
    pub fn fail(&self, query: &str) {
        lock(&self.script).insert(query.to_string(), Scripted::Fail);
    }

    /// Hold the next request for `query` until [`MockTransport::release`].
    ///
    /// Returns a notifier signalled once the held request has arrived.
    pub fn block(&self, query: &str) -> Arc<Notify> {
        let entered = Arc::new(Notify::new());
        *lock(&self.gate) = Some(Gate {
            query: query.to_string(),
            armed: true,
            entered: Arc::clone(&entered),
            release: Arc::new(Notify::new()),
        });
        entered
    }

    /// Let the held request proceed.
    pub fn release(&self) {
        if let Some(gate) = lock(&self.gate).as_ref() {
            gate.release.notify_one();
        }
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    /// Number of recorded requests for `query`.
    pub fn count(&self, query: &str) -> usize {
        lock(&self.requests).iter().filter(|path| path.as_str() == query).count()
    }

    fn held(&self, query: &str) -> Option<(Arc<Notify>, Arc<Notify>)> {
        let mut gate = lock(&self.gate);
        let gate = gate.as_mut().filter(|gate| gate.armed && gate.query == query)?;
        gate.armed = false;
        Some((Arc::clone(&gate.entered), Arc::clone(&gate.release)))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path_and_query: &str) -> Result<TransportResponse> {
        lock(&self.requests).push(path_and_query.to_string());

        if let Some((entered, release)) = self.held(path_and_query) {
            entered.notify_one();
            release.notified().await;
        }

        let scripted = lock(&self.script).get(path_and_query).cloned();
        match scripted {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail) => Err(CameraError::transport(path_and_query, "connection refused")),
            None => Ok(TransportResponse { status: 404, body: String::new() }),
        }
    }
}

/// Canned replies and byte streams.
pub mod fixtures {
    use super::*;

    pub const OK_REPLY: &str =
        r#"<?xml version="1.0" encoding="UTF-8"?><camrply><result>ok</result></camrply>"#;

    /// Full menu descriptor of a camera with three ISO, two shutter and two
    /// aperture values plus a capture command. ISO 400 has no localized title.
    pub const ALLMENU_REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<camrply><result>ok</result>
<menuset date="2017" model="DC-GH5" version="1.0">
  <photosettings>
    <item id="menu_item_id_iso" title_id="l_iso">
      <item id="menu_item_id_iso_auto" title_id="l_iso_auto" cmd_mode="setsetting" cmd_type="iso" cmd_value="auto"/>
      <item id="menu_item_id_iso_100" title_id="l_iso_100" cmd_mode="setsetting" cmd_type="iso" cmd_value="100"/>
      <item id="menu_item_id_iso_400" cmd_mode="setsetting" cmd_type="iso" cmd_value="400"/>
    </item>
    <item id="menu_item_id_shtrspeed" title_id="l_shtrspeed">
      <item id="menu_item_id_ss_16" title_id="l_ss_16" cmd_mode="setsetting" cmd_type="shtrspeed" cmd_value="1024/256"/>
      <item id="menu_item_id_ss_250" title_id="l_ss_250" cmd_mode="setsetting" cmd_type="shtrspeed" cmd_value="2048/256"/>
    </item>
    <item id="menu_item_id_focal" title_id="l_focal">
      <item id="menu_item_id_f_2_8" title_id="l_f_2_8" cmd_mode="setsetting" cmd_type="focal" cmd_value="768/256"/>
      <item id="menu_item_id_f_5_6" title_id="l_f_5_6" cmd_mode="setsetting" cmd_type="focal" cmd_value="1280/256"/>
    </item>
  </photosettings>
  <drivesettings>
    <item id="menu_item_id_capture" title_id="l_capture" cmd_mode="camcmd" cmd_value="capture"/>
  </drivesettings>
  <titlelist date="2017" model="DC-GH5" version="1.0">
    <language code="en">
      <title id="l_iso_auto">AUTO</title>
      <title id="l_iso_100">100</title>
      <title id="l_ss_16">1/16</title>
      <title id="l_ss_250">1/250</title>
      <title id="l_f_2_8">F2.8</title>
      <title id="l_f_5_6">F5.6</title>
    </language>
    <language code="de">
      <title id="l_iso_auto">AUTOM.</title>
    </language>
  </titlelist>
</menuset>
</camrply>"#;

    /// Current-menu descriptor offering a different ISO range.
    pub const CURMENU_REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<camrply><result>ok</result>
<menuset model="DC-GH5">
  <photosettings>
    <item id="menu_item_id_iso_800" title_id="l_iso_800" cmd_mode="setsetting" cmd_type="iso" cmd_value="800"/>
  </photosettings>
  <titlelist>
    <language code="en"><title id="l_iso_800">800</title></language>
  </titlelist>
</menuset>
</camrply>"#;

    /// `getstate` reply with the given `rec` flag.
    pub fn state_reply(rec: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><camrply><result>ok</result><state><batt>3/3</batt><cammode>rec</cammode><remaincapacity>1024</remaincapacity><sdcardstatus>write_enable</sdcardstatus><rec>{rec}</rec><temperature>normal</temperature></state></camrply>"#
        )
    }

    /// `getstate` reply without a state payload.
    pub const STATELESS_REPLY: &str =
        r#"<?xml version="1.0" encoding="UTF-8"?><camrply><result>ok</result></camrply>"#;

    /// Off-frame block with the given raw values at the default layout offsets.
    pub fn metadata_block(mode: u8, iso: u16, shutter: i16, aperture: u16) -> Vec<u8> {
        let layout = OffFrameLayout::default();
        let mut block = vec![0u8; MIN_METADATA_LEN];
        block[layout.mode.offset] = mode;
        block[layout.iso.offset..layout.iso.offset + 2].copy_from_slice(&iso.to_be_bytes());
        block[layout.shutter.offset..layout.shutter.offset + 2].copy_from_slice(&shutter.to_be_bytes());
        block[layout.aperture.offset..layout.aperture.offset + 2]
            .copy_from_slice(&aperture.to_be_bytes());
        block
    }

    /// A JPEG image whose payload contains no marker pairs.
    pub fn jpeg(payload_len: usize) -> Vec<u8> {
        let mut image = Vec::with_capacity(payload_len + 4);
        image.extend([0xFF, 0xD8]);
        image.extend((0..payload_len).map(|i| (i % 251) as u8 & 0x7F));
        image.extend([0xFF, 0xD9]);
        image
    }

    /// `frames` images of `payload_len` bytes, each followed by `block`.
    ///
    /// Every block is terminated by the next image's start marker, so a
    /// demuxer yields `frames` frames and `frames - 1` blocks.
    pub fn live_view_stream(frames: usize, payload_len: usize, block: &[u8]) -> Vec<u8> {
        let mut stream = Vec::new();
        for index in 0..frames {
            if index > 0 {
                stream.extend_from_slice(block);
            }
            stream.extend(jpeg(payload_len));
        }
        stream
    }
}
