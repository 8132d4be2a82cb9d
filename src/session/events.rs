//! Call events
//!
//! Every state change of the coordinator is driven by one of these events,
//! processed one at a time in queue order.

use super::state::ConnectionStatus;
use crate::capture::{TrackKind, TrackRef};
use crate::transport::{ParticipantId, TransportEvent};
use crate::utils::error::{TransportError, UiError};

/// Inputs to the call state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    JoinRequested { app_id: String, channel: String },
    JoinSucceeded { local_uid: ParticipantId },
    JoinFailed { error: TransportError },
    LeaveRequested,
    DeviceToggled { kind: TrackKind, enabled: bool },
    /// Join-time enable from configuration; failures only reach the error
    /// aggregator
    DeviceAutoEnabled { kind: TrackKind },
    ParticipantJoined { participant: ParticipantId },
    ParticipantLeft { participant: ParticipantId },
    TrackPublished { participant: ParticipantId, track: TrackRef },
    TrackUnpublished { participant: ParticipantId, kind: TrackKind },
    PublishFailed { error: TransportError },
    ConnectionLost { reason: String },
}

impl From<TransportEvent> for CallEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::ParticipantJoined { participant } => {
                CallEvent::ParticipantJoined { participant }
            }
            TransportEvent::ParticipantLeft { participant } => {
                CallEvent::ParticipantLeft { participant }
            }
            TransportEvent::TrackPublished { participant, track } => {
                CallEvent::TrackPublished { participant, track }
            }
            TransportEvent::TrackUnpublished { participant, kind } => {
                CallEvent::TrackUnpublished { participant, kind }
            }
            TransportEvent::ConnectionLost { reason } => CallEvent::ConnectionLost { reason },
        }
    }
}

/// Notifications broadcast to observers of the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallNotification {
    StatusChanged(ConnectionStatus),
    DeviceChanged { kind: TrackKind, enabled: bool },
    ParticipantAdded(ParticipantId),
    ParticipantRemoved(ParticipantId),
    Error(UiError),
}
