//! Device track provider
//!
//! Owns the local camera and microphone tracks. A track of a given kind
//! exists only while its enabled flag is true.

use super::traits::{CaptureHandle, DeviceCapture, TrackKind, TrackRef};
use crate::utils::error::DeviceError;
use std::sync::Arc;

/// A local capture track. Dropping it releases the device.
#[derive(Debug)]
pub struct LocalTrack {
    track: TrackRef,
    handle: Box<dyn CaptureHandle>,
}

impl LocalTrack {
    fn new(handle: Box<dyn CaptureHandle>) -> Self {
        Self {
            track: handle.track().clone(),
            handle,
        }
    }

    pub fn track(&self) -> &TrackRef {
        &self.track
    }

    pub fn kind(&self) -> TrackKind {
        self.track.kind
    }
}

impl Drop for LocalTrack {
    fn drop(&mut self) {
        self.handle.release();
        tracing::debug!("Released local {} track {}", self.track.kind, self.track.id);
    }
}

/// Outcome of a toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChange {
    /// A new capture was acquired
    Acquired(TrackRef),
    /// A held capture was released
    Released(TrackRef),
    /// Requested state already held
    Unchanged,
}

#[derive(Debug, Default)]
struct DeviceSlot {
    enabled: bool,
    track: Option<LocalTrack>,
}

/// Acquires and releases local capture tracks in response to toggles
pub struct DeviceTrackProvider {
    capture: Arc<dyn DeviceCapture>,
    audio: DeviceSlot,
    video: DeviceSlot,
}

impl DeviceTrackProvider {
    pub fn new(capture: Arc<dyn DeviceCapture>) -> Self {
        Self {
            capture,
            audio: DeviceSlot::default(),
            video: DeviceSlot::default(),
        }
    }

    fn slot(&self, kind: TrackKind) -> &DeviceSlot {
        match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Video => &self.video,
        }
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut DeviceSlot {
        match kind {
            TrackKind::Audio => &mut self.audio,
            TrackKind::Video => &mut self.video,
        }
    }

    /// Enable or disable the device behind `kind`.
    ///
    /// Enabling acquires a capture; on failure the flag reverts to false and
    /// no track is kept. Disabling releases the held capture before returning.
    pub async fn set_enabled(
        &mut self,
        kind: TrackKind,
        enabled: bool,
    ) -> Result<DeviceChange, DeviceError> {
        if !enabled {
            let slot = self.slot_mut(kind);
            slot.enabled = false;
            return Ok(match slot.track.take() {
                Some(track) => {
                    let track_ref = track.track().clone();
                    drop(track);
                    tracing::info!("{} disabled", kind.device_name());
                    DeviceChange::Released(track_ref)
                }
                None => DeviceChange::Unchanged,
            });
        }

        if self.slot(kind).track.is_some() {
            return Ok(DeviceChange::Unchanged);
        }

        let capture = Arc::clone(&self.capture);
        self.slot_mut(kind).enabled = true;

        match capture.acquire(kind).await {
            Ok(handle) => {
                let track = LocalTrack::new(handle);
                let track_ref = track.track().clone();
                self.slot_mut(kind).track = Some(track);
                tracing::info!("{} enabled (track {})", kind.device_name(), track_ref.id);
                Ok(DeviceChange::Acquired(track_ref))
            }
            Err(e) => {
                self.slot_mut(kind).enabled = false;
                tracing::warn!("Failed to acquire {}: {}", kind.device_label(), e);
                Err(e)
            }
        }
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.slot(kind).enabled
    }

    /// The live track of `kind`, if any
    pub fn track(&self, kind: TrackKind) -> Option<&TrackRef> {
        self.slot(kind).track.as_ref().map(LocalTrack::track)
    }

    /// All live local tracks, audio first
    pub fn tracks(&self) -> Vec<TrackRef> {
        [TrackKind::Audio, TrackKind::Video]
            .into_iter()
            .filter_map(|kind| self.track(kind).cloned())
            .collect()
    }

    /// Release every held capture and clear both enabled flags
    pub fn release_all(&mut self) -> Vec<TrackRef> {
        let mut released = Vec::new();
        for kind in [TrackKind::Audio, TrackKind::Video] {
            let slot = self.slot_mut(kind);
            slot.enabled = false;
            if let Some(track) = slot.track.take() {
                released.push(track.track().clone());
            }
        }
        released
    }
}
