//! Call session module
//!
//! This module implements the call-session state machine:
//! - CallCoordinator driving join/leave, devices, publication and rendering
//! - ParticipantRegistry for remote participants
//! - ErrorAggregator for the single user-visible error
//! - CallController running the coordinator as an event loop

pub mod aggregator;
pub mod controller;
pub mod coordinator;
pub mod events;
pub mod publication;
pub mod registry;
pub mod state;
pub mod view;

pub use aggregator::ErrorAggregator;
pub use controller::{CallCommand, CallController, CallHandle};
pub use coordinator::CallCoordinator;
pub use events::{CallEvent, CallNotification};
pub use publication::PublicationManager;
pub use registry::{ParticipantRegistry, RemoteParticipant};
pub use state::{CallConfig, ChannelMode, ClientOptions, ConnectionStatus, JoinForm, Session, VideoCodec};
pub use view::CallView;
