//! Signaling/transport trait definitions
//!
//! The remote session service is an external collaborator: it owns the
//! network connection and the remote media. This module only names the
//! operations the call coordinator drives and the notifications it reacts to.

use crate::capture::{TrackKind, TrackRef};
use crate::utils::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a session participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notifications delivered by the transport, one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A remote participant entered the channel
    ParticipantJoined { participant: ParticipantId },
    /// A remote participant left the channel
    ParticipantLeft { participant: ParticipantId },
    /// A remote participant published a track
    TrackPublished {
        participant: ParticipantId,
        track: TrackRef,
    },
    /// A remote participant stopped publishing a track
    TrackUnpublished {
        participant: ParticipantId,
        kind: TrackKind,
    },
    /// The connection dropped without a local leave
    ConnectionLost { reason: String },
}

/// Signaling/transport service
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Join `channel` under `app_id`; returns the local participant identity
    async fn join(
        &self,
        app_id: &str,
        channel: &str,
        token: Option<&str>,
    ) -> Result<ParticipantId, TransportError>;

    async fn leave(&self) -> Result<(), TransportError>;

    async fn publish(&self, tracks: &[TrackRef]) -> Result<(), TransportError>;

    async fn unpublish(&self, tracks: &[TrackRef]) -> Result<(), TransportError>;
}
