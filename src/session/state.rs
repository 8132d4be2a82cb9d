//! Call session state
//!
//! Defines the connection state machine, session tracking and configuration.

use crate::transport::ParticipantId;
use crate::utils::error::ConfigError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable that pre-fills the application identity
pub const APP_ID_ENV: &str = "CALLROOM_APP_ID";

/// Connection state of the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Not in a channel
    #[default]
    Disconnected,
    /// Join sent, waiting for the signaling layer
    Joining,
    /// In the channel
    Connected,
}

/// One channel membership, from join to leave
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub app_id: String,
    pub channel: String,
    pub status: ConnectionStatus,

    /// Identity assigned by the signaling layer once joined
    pub local_uid: Option<ParticipantId>,

    /// Unix timestamp when the join was requested
    pub requested_unix_ms: u64,

    /// Unix timestamp when the join was acknowledged
    pub connected_unix_ms: Option<u64>,
}

fn now_unix_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

impl Session {
    pub fn new(app_id: String, channel: String) -> Self {
        Self {
            app_id,
            channel,
            status: ConnectionStatus::Joining,
            local_uid: None,
            requested_unix_ms: now_unix_ms(),
            connected_unix_ms: None,
        }
    }

    pub fn mark_connected(&mut self, local_uid: ParticipantId) {
        self.status = ConnectionStatus::Connected;
        self.local_uid = Some(local_uid);
        self.connected_unix_ms = Some(now_unix_ms());
    }
}

/// Channel profile requested from the signaling layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    #[default]
    Rtc,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    Vp8,
    Vp9,
    H264,
}

/// Options the transport client is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    pub mode: ChannelMode,
    pub codec: VideoCodec,
}

/// Configuration for a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallConfig {
    /// Application identity pre-filled into the join form
    pub app_id: String,

    /// Join token, if the channel requires one
    pub token: Option<String>,

    pub client: ClientOptions,

    /// Enable the microphone once a join succeeds
    pub mic_on_join: bool,

    /// Enable the camera once a join succeeds
    pub camera_on_join: bool,

    /// Capacity of the command queue and the notification channel
    pub event_capacity: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            token: None,
            client: ClientOptions::default(),
            mic_on_join: true,
            camera_on_join: true,
            event_capacity: 64,
        }
    }
}

impl CallConfig {
    /// Defaults with the application identity taken from the environment
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Read a JSON config file, then apply the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: CallConfig = serde_json::from_str(&content)?;

        tracing::debug!("Loaded call config from {:?}", path);

        Ok(config.with_env())
    }

    fn with_env(mut self) -> Self {
        if self.app_id.is_empty() {
            if let Ok(app_id) = std::env::var(APP_ID_ENV) {
                self.app_id = app_id;
            }
        }
        self
    }
}

/// Contents of the join form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinForm {
    pub app_id: String,
    pub channel: String,
}

impl JoinForm {
    pub fn new(app_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            channel: channel.into(),
        }
    }

    /// Join is offered only when both fields are filled in
    pub fn can_submit(&self) -> bool {
        !self.app_id.trim().is_empty() && !self.channel.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = CallConfig::default();
        assert!(config.mic_on_join);
        assert!(config.camera_on_join);
        assert_eq!(config.client.mode, ChannelMode::Rtc);
        assert_eq!(config.client.codec, VideoCodec::Vp8);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("call.json");
        std::fs::write(
            &path,
            r#"{ "appId": "A1", "cameraOnJoin": false, "client": { "codec": "h264" } }"#,
        )
        .unwrap();

        let config = CallConfig::load(&path).unwrap();
        assert_eq!(config.app_id, "A1");
        assert!(!config.camera_on_join);
        assert!(config.mic_on_join);
        assert_eq!(config.client.codec, VideoCodec::H264);
        assert_eq!(config.client.mode, ChannelMode::Rtc);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();

        let missing = CallConfig::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(CallConfig::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_join_form_requires_both_fields() {
        assert!(!JoinForm::default().can_submit());
        assert!(!JoinForm::new("A1", "").can_submit());
        assert!(!JoinForm::new("", "room1").can_submit());
        assert!(!JoinForm::new("A1", "   ").can_submit());
        assert!(JoinForm::new("A1", "room1").can_submit());
    }

    #[test]
    fn test_session_lifecycle_timestamps() {
        let mut session = Session::new("A1".to_string(), "room1".to_string());
        assert_eq!(session.status, ConnectionStatus::Joining);
        assert!(session.requested_unix_ms > 0);
        assert!(session.connected_unix_ms.is_none());

        session.mark_connected(ParticipantId::new("42"));
        assert_eq!(session.status, ConnectionStatus::Connected);
        assert_eq!(session.local_uid, Some(ParticipantId::new("42")));
        assert!(session.connected_unix_ms.unwrap() >= session.requested_unix_ms);
    }
}
