//! Remote session transport

pub mod traits;

pub use traits::{ParticipantId, SignalingTransport, TransportEvent};
