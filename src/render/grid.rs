//! Render grid
//!
//! Keeps one surface per participant: the local tile first, then remote
//! tiles in arrival order.

use super::sink::{RenderSink, TileKey};
use super::surface::RenderSurface;
use crate::capture::{TrackKind, TrackRef};
use crate::session::registry::RemoteParticipant;
use crate::transport::ParticipantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Renderable description of a tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub key: TileKey,
    pub label: String,
    pub has_video: bool,
    pub has_audio: bool,
}

pub struct RenderGrid {
    sink: Arc<dyn RenderSink>,
    local: Option<RenderSurface>,
    remote: Vec<RenderSurface>,
}

impl RenderGrid {
    pub fn new(sink: Arc<dyn RenderSink>) -> Self {
        Self {
            sink,
            local: None,
            remote: Vec::new(),
        }
    }

    /// Show the local tile with `video` bound (local audio is never played back)
    pub fn sync_local(&mut self, video: Option<&TrackRef>) {
        let surface = self
            .local
            .get_or_insert_with(|| RenderSurface::new(TileKey::Local));
        surface.sync(&self.sink, TrackKind::Video, video);
    }

    /// Create or update the tile of a remote participant
    pub fn sync_participant(&mut self, participant: &RemoteParticipant) {
        let key = TileKey::Remote(participant.id.clone());
        let index = match self.remote.iter().position(|s| s.key() == &key) {
            Some(index) => index,
            None => {
                self.remote.push(RenderSurface::new(key));
                self.remote.len() - 1
            }
        };

        let surface = &mut self.remote[index];
        surface.sync(&self.sink, TrackKind::Video, participant.video.as_ref());
        surface.sync(&self.sink, TrackKind::Audio, participant.audio.as_ref());
    }

    /// Drop the tile of a remote participant, releasing its bindings
    pub fn remove_participant(&mut self, id: &ParticipantId) {
        self.remote
            .retain(|surface| !matches!(surface.key(), TileKey::Remote(key) if key == id));
    }

    /// Drop every tile
    pub fn clear(&mut self) {
        self.remote.clear();
        self.local = None;
    }

    pub fn tiles(&self) -> Vec<TileView> {
        self.local
            .iter()
            .chain(self.remote.iter())
            .map(|surface| TileView {
                key: surface.key().clone(),
                label: surface.label(),
                has_video: surface.has_video(),
                has_audio: surface.has_audio(),
            })
            .collect()
    }
}
