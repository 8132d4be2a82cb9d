//! Error types and handling
//!
//! Failures from every stage of a call (device capture, signaling, publishing,
//! rendering, configuration) and their user-facing form.

use crate::capture::TrackKind;
use crate::capture::TrackId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture acquisition failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("no {} found", .0.device_label())]
    NotFound(TrackKind),

    #[error("permission denied for {}", .0.device_label())]
    PermissionDenied(TrackKind),

    #[error("{} capture failed: {message}", .kind.device_label())]
    CaptureFailed { kind: TrackKind, message: String },
}

impl DeviceError {
    /// The device kind this failure belongs to
    pub fn kind(&self) -> TrackKind {
        match self {
            DeviceError::NotFound(kind) | DeviceError::PermissionDenied(kind) => *kind,
            DeviceError::CaptureFailed { kind, .. } => *kind,
        }
    }
}

/// Failure reported by the signaling/transport layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("not connected")]
    NotConnected,

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Render sink refused a track
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to attach track {track}: {message}")]
pub struct RenderError {
    pub track: TrackId,
    pub message: String,
}

/// Configuration could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum CallError {
    #[error("App ID and Channel name are required to join.")]
    MissingJoinParameters,

    #[error("a call session is already active")]
    SessionActive,

    #[error("join failed: {0}")]
    Join(TransportError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("call controller has stopped")]
    ControllerClosed,
}

/// Error response for a UI or IPC layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<CallError> for ErrorResponse {
    fn from(error: CallError) -> Self {
        let code = match &error {
            CallError::MissingJoinParameters => "MISSING_JOIN_PARAMETERS",
            CallError::SessionActive => "SESSION_ACTIVE",
            CallError::Join(_) => "JOIN_ERROR",
            CallError::Device(_) => "DEVICE_ERROR",
            CallError::Config(_) => "CONFIG_ERROR",
            CallError::ControllerClosed => "CONTROLLER_CLOSED",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using CallError
pub type CallResult<T> = Result<T, CallError>;

/// Which part of the call produced a user-visible error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Mic,
    Camera,
    Join,
    Publish,
}

impl From<TrackKind> for ErrorSource {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => ErrorSource::Mic,
            TrackKind::Video => ErrorSource::Camera,
        }
    }
}

/// The single message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiError {
    pub source: ErrorSource,
    pub message: String,
}

impl UiError {
    pub fn device(error: &DeviceError) -> Self {
        let kind = error.kind();
        Self {
            source: kind.into(),
            message: format!("{} error: {}", kind.device_name(), error),
        }
    }

    pub fn join(error: &TransportError) -> Self {
        Self {
            source: ErrorSource::Join,
            message: format!("Join error: {error}"),
        }
    }

    pub fn publish(error: &TransportError) -> Self {
        Self {
            source: ErrorSource::Publish,
            message: format!("Publish error: {error}"),
        }
    }

    pub fn missing_join_parameters() -> Self {
        Self {
            source: ErrorSource::Join,
            message: CallError::MissingJoinParameters.to_string(),
        }
    }

    pub fn connection_lost(reason: &str) -> Self {
        Self {
            source: ErrorSource::Join,
            message: format!("Join error: connection lost: {reason}"),
        }
    }
}
