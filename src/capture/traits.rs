//! Capture trait definitions
//!
//! Platform-agnostic seam to the device-capture service, plus the track
//! descriptors shared by capture, transport and rendering.

use crate::utils::error::DeviceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    /// Capitalized name of the capture device behind this kind
    pub fn device_name(&self) -> &'static str {
        match self {
            TrackKind::Audio => "Microphone",
            TrackKind::Video => "Camera",
        }
    }

    /// Lowercase device name for use inside sentences
    pub fn device_label(&self) -> &'static str {
        match self {
            TrackKind::Audio => "microphone",
            TrackKind::Video => "camera",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Opaque identifier of a media track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lightweight reference to a track, local or remote.
///
/// The media itself is owned elsewhere (the capture handle for local tracks,
/// the transport for remote ones); this is what gets handed to the transport
/// for publishing and to the render sink for playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: TrackId,
    pub kind: TrackKind,
}

impl TrackRef {
    pub fn new(id: TrackId, kind: TrackKind) -> Self {
        Self { id, kind }
    }
}

/// A live capture produced by the device-capture service.
///
/// `release` stops capture and frees the device. It is called exactly once,
/// synchronously, when the owning local track is dropped.
pub trait CaptureHandle: Send + Sync + fmt::Debug {
    fn track(&self) -> &TrackRef;

    fn release(&mut self);
}

/// Device-capture service
#[async_trait]
pub trait DeviceCapture: Send + Sync {
    async fn acquire_camera(&self) -> Result<Box<dyn CaptureHandle>, DeviceError>;

    async fn acquire_microphone(&self) -> Result<Box<dyn CaptureHandle>, DeviceError>;

    /// Acquire the device behind `kind`
    async fn acquire(&self, kind: TrackKind) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        match kind {
            TrackKind::Audio => self.acquire_microphone().await,
            TrackKind::Video => self.acquire_camera().await,
        }
    }
}
