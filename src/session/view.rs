//! View snapshot
//!
//! Everything a UI needs to draw the call page, in one serializable value.

use super::coordinator::CallCoordinator;
use super::state::{ConnectionStatus, JoinForm};
use crate::capture::TrackKind;
use crate::render::TileView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinFormView {
    pub app_id: String,
    pub channel: String,
    pub can_join: bool,
}

impl From<&JoinForm> for JoinFormView {
    fn from(form: &JoinForm) -> Self {
        Self {
            app_id: form.app_id.clone(),
            channel: form.channel.clone(),
            can_join: form.can_submit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub on: bool,
    pub published: bool,
    pub caption: String,
}

impl DeviceView {
    fn new(kind: TrackKind, on: bool, published: bool) -> Self {
        let name = match kind {
            TrackKind::Audio => "Mic",
            TrackKind::Video => "Camera",
        };
        Self {
            on,
            published,
            caption: format!("{} {}", name, if on { "On" } else { "Off" }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallView {
    pub status: ConnectionStatus,

    /// "Room: <channel>" while connected
    pub room_title: Option<String>,

    pub form: JoinFormView,
    pub mic: DeviceView,
    pub camera: DeviceView,

    /// The single error message, if any
    pub error: Option<String>,

    /// Local tile first, then remote tiles in arrival order
    pub tiles: Vec<TileView>,
}

impl CallView {
    pub fn capture(coordinator: &CallCoordinator) -> Self {
        let status = coordinator.status();
        let room_title = match (status, coordinator.session()) {
            (ConnectionStatus::Connected, Some(session)) => Some(format!("Room: {}", session.channel)),
            _ => None,
        };
        let devices = coordinator.devices();
        let publications = coordinator.publications();

        Self {
            status,
            room_title,
            form: coordinator.form().into(),
            mic: DeviceView::new(
                TrackKind::Audio,
                devices.is_enabled(TrackKind::Audio),
                publications.is_published(TrackKind::Audio),
            ),
            camera: DeviceView::new(
                TrackKind::Video,
                devices.is_enabled(TrackKind::Video),
                publications.is_published(TrackKind::Video),
            ),
            error: coordinator.errors().message().map(str::to_string),
            tiles: coordinator.grid().tiles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::loopback::{LoopbackCapture, LoopbackTransport, MemorySink};
    use crate::session::state::CallConfig;
    use std::sync::Arc;

    fn coordinator(config: CallConfig) -> CallCoordinator {
        let (transport, _events) = LoopbackTransport::new(config.client);
        CallCoordinator::new(
            config,
            Arc::new(transport),
            Arc::new(LoopbackCapture::new()),
            Arc::new(MemorySink::new()),
        )
    }

    #[test]
    fn test_initial_view_prefills_app_id() {
        let config = CallConfig {
            app_id: "A1".to_string(),
            ..CallConfig::default()
        };
        let view = CallView::capture(&coordinator(config));

        assert_eq!(view.status, ConnectionStatus::Disconnected);
        assert_eq!(view.form.app_id, "A1");
        assert!(!view.form.can_join);
        assert!(view.room_title.is_none());
        assert_eq!(view.mic.caption, "Mic Off");
        assert!(view.tiles.is_empty());
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn test_connected_view() {
        let mut coordinator = coordinator(CallConfig::default());
        coordinator.join("A1", "room1").await.unwrap();

        let view = CallView::capture(&coordinator);
        assert_eq!(view.room_title.as_deref(), Some("Room: room1"));
        assert_eq!(view.mic.caption, "Mic On");
        assert_eq!(view.camera.caption, "Camera On");
        assert!(view.camera.published);
        assert_eq!(view.tiles[0].label, "You");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "connected");
        assert_eq!(json["roomTitle"], "Room: room1");
        assert_eq!(json["tiles"][0]["hasVideo"], true);
    }
}
