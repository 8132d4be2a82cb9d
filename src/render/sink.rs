//! Render sink seam

use crate::capture::TrackRef;
use crate::transport::ParticipantId;
use crate::utils::error::RenderError;
use serde::{Deserialize, Serialize};

/// Which tile of the call grid a surface belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum TileKey {
    Local,
    Remote(ParticipantId),
}

impl TileKey {
    /// Caption shown on the tile
    pub fn label(&self) -> String {
        match self {
            TileKey::Local => "You".to_string(),
            TileKey::Remote(id) => format!("User {id}"),
        }
    }
}

/// Where a bound track plays
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The visual surface of a tile
    Surface(TileKey),
    /// The audio output device
    AudioOutput,
}

/// Output sink for tracks (video surfaces and the audio output).
///
/// Both calls are synchronous so a release completes together with the
/// state change that triggered it.
pub trait RenderSink: Send + Sync {
    fn attach(&self, track: &TrackRef, target: &RenderTarget) -> Result<(), RenderError>;

    fn detach(&self, track: &TrackRef);
}
