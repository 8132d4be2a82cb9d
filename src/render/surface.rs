//! Per-participant render surface

use super::binding::ScopedBinding;
use super::sink::{RenderSink, RenderTarget, TileKey};
use crate::capture::{TrackKind, TrackRef};
use std::sync::Arc;

/// One tile of the call grid: a video binding and an audio binding
#[derive(Debug)]
pub struct RenderSurface {
    key: TileKey,
    video: Option<ScopedBinding>,
    audio: Option<ScopedBinding>,
}

impl RenderSurface {
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            video: None,
            audio: None,
        }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn label(&self) -> String {
        self.key.label()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Point the `kind` slot at `track`.
    ///
    /// The previous binding is released before a new one is made, so a slot
    /// never renders a handle that has been replaced.
    pub fn sync(&mut self, sink: &Arc<dyn RenderSink>, kind: TrackKind, track: Option<&TrackRef>) {
        let target = match kind {
            TrackKind::Video => RenderTarget::Surface(self.key.clone()),
            TrackKind::Audio => RenderTarget::AudioOutput,
        };
        let slot = match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        };

        let current = slot.as_ref().map(|binding| &binding.track().id);
        if current == track.map(|t| &t.id) {
            return;
        }

        *slot = None;

        if let Some(track) = track {
            match ScopedBinding::bind(sink, track.clone(), target) {
                Ok(binding) => *slot = Some(binding),
                Err(e) => tracing::warn!("Render surface '{}': {}", self.key.label(), e),
            }
        }
    }
}
