//! Local device capture
//!
//! This module provides camera and microphone acquisition for the local
//! participant and the provider that owns the resulting tracks.

pub mod provider;
pub mod traits;

#[cfg(feature = "native-capture")]
pub mod native;

pub use provider::{DeviceChange, DeviceTrackProvider, LocalTrack};
pub use traits::{CaptureHandle, DeviceCapture, TrackId, TrackKind, TrackRef};
