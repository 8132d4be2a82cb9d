//! In-process loopback backends
//!
//! Memory-only implementations of the transport, capture and render seams.
//! Failures can be scripted and live resources inspected, which makes them
//! the backends of choice for tests and the demo binary.

use crate::capture::{CaptureHandle, DeviceCapture, TrackId, TrackKind, TrackRef};
use crate::render::{RenderSink, RenderTarget};
use crate::session::state::ClientOptions;
use crate::transport::{ParticipantId, SignalingTransport, TransportEvent};
use crate::utils::error::{DeviceError, RenderError, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct TransportState {
    joined: Option<(String, ParticipantId)>,
    published: Vec<TrackRef>,
    next_join_error: Option<TransportError>,
    next_publish_error: Option<TransportError>,
    join_calls: usize,
    leave_calls: usize,
    publish_calls: usize,
}

/// Signaling transport that joins instantly and lets tests inject remote
/// participants
pub struct LoopbackTransport {
    options: ClientOptions,
    state: Mutex<TransportState>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl LoopbackTransport {
    /// Create the transport and the receiver its notifications arrive on
    pub fn new(options: ClientOptions) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            options,
            state: Mutex::new(TransportState::default()),
            events,
        };
        (transport, rx)
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    pub fn fail_next_join(&self, error: TransportError) {
        self.state.lock().next_join_error = Some(error);
    }

    pub fn fail_next_publish(&self, error: TransportError) {
        self.state.lock().next_publish_error = Some(error);
    }

    /// Channel currently joined
    pub fn channel(&self) -> Option<String> {
        self.state.lock().joined.as_ref().map(|(channel, _)| channel.clone())
    }

    /// Local tracks currently published
    pub fn published(&self) -> Vec<TrackRef> {
        self.state.lock().published.clone()
    }

    pub fn join_calls(&self) -> usize {
        self.state.lock().join_calls
    }

    pub fn leave_calls(&self) -> usize {
        self.state.lock().leave_calls
    }

    pub fn publish_calls(&self) -> usize {
        self.state.lock().publish_calls
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Loopback transport has no listener");
        }
    }

    /// Simulate a remote participant entering the channel
    pub fn remote_join(&self, participant: &ParticipantId) {
        self.emit(TransportEvent::ParticipantJoined {
            participant: participant.clone(),
        });
    }

    /// Simulate a remote participant publishing a track; returns its reference
    pub fn remote_publish(&self, participant: &ParticipantId, kind: TrackKind) -> TrackRef {
        let track = TrackRef::new(TrackId::new(format!("{participant}-{kind}")), kind);
        self.emit(TransportEvent::TrackPublished {
            participant: participant.clone(),
            track: track.clone(),
        });
        track
    }

    pub fn remote_unpublish(&self, participant: &ParticipantId, kind: TrackKind) {
        self.emit(TransportEvent::TrackUnpublished {
            participant: participant.clone(),
            kind,
        });
    }

    pub fn remote_leave(&self, participant: &ParticipantId) {
        self.emit(TransportEvent::ParticipantLeft {
            participant: participant.clone(),
        });
    }

    /// Simulate the connection dropping
    pub fn drop_connection(&self, reason: &str) {
        self.state.lock().joined = None;
        self.emit(TransportEvent::ConnectionLost {
            reason: reason.to_string(),
        });
    }
}

#[async_trait]
impl SignalingTransport for LoopbackTransport {
    async fn join(
        &self,
        app_id: &str,
        channel: &str,
        token: Option<&str>,
    ) -> Result<ParticipantId, TransportError> {
        let mut state = self.state.lock();
        state.join_calls += 1;

        if let Some(error) = state.next_join_error.take() {
            return Err(error);
        }
        if state.joined.is_some() {
            return Err(TransportError::Rejected("already joined".to_string()));
        }

        let uid = ParticipantId::generate();
        tracing::debug!(
            "Loopback join: app={} channel={} token={} mode={:?} codec={:?} -> {}",
            app_id,
            channel,
            token.is_some(),
            self.options.mode,
            self.options.codec,
            uid
        );
        state.joined = Some((channel.to_string(), uid.clone()));
        Ok(uid)
    }

    async fn leave(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.leave_calls += 1;
        state.published.clear();
        state.joined = None;
        Ok(())
    }

    async fn publish(&self, tracks: &[TrackRef]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.publish_calls += 1;

        if let Some(error) = state.next_publish_error.take() {
            return Err(error);
        }
        if state.joined.is_none() {
            return Err(TransportError::NotConnected);
        }
        for track in tracks {
            if !state.published.contains(track) {
                state.published.push(track.clone());
            }
        }
        Ok(())
    }

    async fn unpublish(&self, tracks: &[TrackRef]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.published.retain(|track| !tracks.contains(track));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CaptureState {
    next_error: BTreeMap<TrackKind, DeviceError>,
    unavailable: BTreeSet<TrackKind>,
    live: BTreeMap<TrackKind, usize>,
    acquisitions: BTreeMap<TrackKind, usize>,
}

/// Device capture that hands out counted fake handles
#[derive(Debug, Default)]
pub struct LoopbackCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl LoopbackCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next acquisition of `error.kind()` fail with `error`
    pub fn fail_next(&self, error: DeviceError) {
        self.state.lock().next_error.insert(error.kind(), error);
    }

    /// Make every acquisition of `kind` fail with `NotFound` until reset
    pub fn set_unavailable(&self, kind: TrackKind, unavailable: bool) {
        let mut state = self.state.lock();
        if unavailable {
            state.unavailable.insert(kind);
        } else {
            state.unavailable.remove(&kind);
        }
    }

    /// Handles of `kind` acquired and not yet released
    pub fn live_handles(&self, kind: TrackKind) -> usize {
        self.state.lock().live.get(&kind).copied().unwrap_or(0)
    }

    /// Successful acquisitions of `kind` so far
    pub fn acquisitions(&self, kind: TrackKind) -> usize {
        self.state.lock().acquisitions.get(&kind).copied().unwrap_or(0)
    }

    fn open(&self, kind: TrackKind) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        let mut state = self.state.lock();
        if let Some(error) = state.next_error.remove(&kind) {
            return Err(error);
        }
        if state.unavailable.contains(&kind) {
            return Err(DeviceError::NotFound(kind));
        }

        *state.live.entry(kind).or_default() += 1;
        *state.acquisitions.entry(kind).or_default() += 1;

        Ok(Box::new(LoopbackHandle {
            track: TrackRef::new(TrackId::generate(), kind),
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

#[async_trait]
impl DeviceCapture for LoopbackCapture {
    async fn acquire_camera(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        self.open(TrackKind::Video)
    }

    async fn acquire_microphone(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        self.open(TrackKind::Audio)
    }
}

#[derive(Debug)]
struct LoopbackHandle {
    track: TrackRef,
    state: Arc<Mutex<CaptureState>>,
    released: bool,
}

impl CaptureHandle for LoopbackHandle {
    fn track(&self) -> &TrackRef {
        &self.track
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(live) = self.state.lock().live.get_mut(&self.track.kind) {
            *live = live.saturating_sub(1);
        }
    }
}

#[derive(Debug, Default)]
struct SinkState {
    attached: Vec<(TrackRef, RenderTarget)>,
    next_error: Option<String>,
    attach_count: usize,
    detach_count: usize,
}

/// Render sink that records what is attached where
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<SinkState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_attach(&self, message: &str) {
        self.state.lock().next_error = Some(message.to_string());
    }

    pub fn attached(&self) -> Vec<(TrackRef, RenderTarget)> {
        self.state.lock().attached.clone()
    }

    pub fn is_attached(&self, id: &TrackId) -> bool {
        self.state.lock().attached.iter().any(|(track, _)| &track.id == id)
    }

    pub fn target_of(&self, id: &TrackId) -> Option<RenderTarget> {
        self.state
            .lock()
            .attached
            .iter()
            .find(|(track, _)| &track.id == id)
            .map(|(_, target)| target.clone())
    }

    /// Successful attaches so far
    pub fn attach_count(&self) -> usize {
        self.state.lock().attach_count
    }

    pub fn detach_count(&self) -> usize {
        self.state.lock().detach_count
    }
}

impl RenderSink for MemorySink {
    fn attach(&self, track: &TrackRef, target: &RenderTarget) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        if let Some(message) = state.next_error.take() {
            return Err(RenderError {
                track: track.id.clone(),
                message,
            });
        }
        state.attach_count += 1;
        state.attached.push((track.clone(), target.clone()));
        Ok(())
    }

    fn detach(&self, track: &TrackRef) {
        let mut state = self.state.lock();
        state.detach_count += 1;
        state.attached.retain(|(attached, _)| attached.id != track.id);
    }
}
