//! End-to-end call scenarios driven through the call controller

use callroom::backends::{LoopbackCapture, LoopbackTransport, MemorySink};
use callroom::capture::TrackKind;
use callroom::render::TileKey;
use callroom::session::CallNotification;
use callroom::transport::ParticipantId;
use callroom::utils::error::{DeviceError, TransportError};
use callroom::{CallConfig, CallController, CallCoordinator, CallError, CallHandle, ConnectionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct Harness {
    call: CallHandle,
    task: JoinHandle<()>,
    transport: Arc<LoopbackTransport>,
    capture: Arc<LoopbackCapture>,
    sink: Arc<MemorySink>,
}

impl Harness {
    fn start(config: CallConfig) -> Self {
        let (transport, events) = LoopbackTransport::new(config.client);
        let transport = Arc::new(transport);
        let capture = Arc::new(LoopbackCapture::new());
        let sink = Arc::new(MemorySink::new());

        let coordinator = CallCoordinator::new(config, transport.clone(), capture.clone(), sink.clone());
        let (call, task) = CallController::spawn(coordinator, events);

        Self {
            call,
            task,
            transport,
            capture,
            sink,
        }
    }

    /// Devices stay off until toggled
    fn manual() -> Self {
        Self::start(CallConfig {
            mic_on_join: false,
            camera_on_join: false,
            ..CallConfig::default()
        })
    }

    async fn stop(self) {
        self.call.shutdown().await.unwrap();
        self.task.await.unwrap();
    }
}

async fn wait_for<F>(rx: &mut broadcast::Receiver<CallNotification>, mut matches: F)
where
    F: FnMut(&CallNotification) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let notification = rx.recv().await.unwrap();
            if matches(&notification) {
                return;
            }
        }
    })
    .await
    .expect("notification did not arrive");
}

#[tokio::test]
async fn test_leave_while_disconnected_is_a_no_op() {
    let h = Harness::manual();

    h.call.leave().await.unwrap();
    h.call.leave().await.unwrap();

    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.status, ConnectionStatus::Disconnected);
    assert!(view.error.is_none());
    assert_eq!(h.transport.leave_calls(), 0);

    h.stop().await;
}

#[tokio::test]
async fn test_join_with_empty_channel_is_rejected_locally() {
    let h = Harness::manual();

    let result = h.call.join("A1", "").await;
    assert!(matches!(result, Err(CallError::MissingJoinParameters)));

    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.status, ConnectionStatus::Disconnected);
    assert_eq!(
        view.error.as_deref(),
        Some("App ID and Channel name are required to join.")
    );
    assert_eq!(view.form.app_id, "A1");
    assert!(!view.form.can_join);
    assert_eq!(h.transport.join_calls(), 0);

    h.stop().await;
}

#[tokio::test]
async fn test_full_call_lifecycle() {
    let h = Harness::manual();
    let mut notifications = h.call.subscribe();

    h.call.join("A1", "room1").await.unwrap();
    assert_eq!(h.call.status(), ConnectionStatus::Connected);

    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.room_title.as_deref(), Some("Room: room1"));
    assert_eq!(view.tiles.len(), 1);
    assert_eq!(view.tiles[0].label, "You");
    assert!(!view.tiles[0].has_video);

    h.call.toggle_device(TrackKind::Video).await.unwrap();
    let view = h.call.snapshot().await.unwrap();
    assert!(view.camera.on);
    assert!(view.camera.published);
    assert_eq!(view.camera.caption, "Camera On");
    assert!(view.tiles[0].has_video);
    assert_eq!(h.transport.published().len(), 1);
    assert_eq!(h.capture.live_handles(TrackKind::Video), 1);

    let u1 = ParticipantId::new("u1");
    h.transport.remote_join(&u1);
    wait_for(&mut notifications, |n| {
        matches!(n, CallNotification::ParticipantAdded(id) if id == &u1)
    })
    .await;
    let remote_video = h.transport.remote_publish(&u1, TrackKind::Video);

    // Snapshots queue behind the remote notification
    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.tiles.len(), 2);
    assert_eq!(view.tiles[1].key, TileKey::Remote(u1.clone()));
    assert_eq!(view.tiles[1].label, "User u1");
    assert!(view.tiles[1].has_video);
    assert!(h.sink.is_attached(&remote_video.id));

    h.call.leave().await.unwrap();
    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.status, ConnectionStatus::Disconnected);
    assert!(view.room_title.is_none());
    assert!(view.tiles.is_empty());
    assert!(!view.camera.on);
    assert!(h.sink.attached().is_empty());
    assert!(h.transport.published().is_empty());
    assert_eq!(h.capture.live_handles(TrackKind::Video), 0);
    assert_eq!(h.transport.leave_calls(), 1);

    h.stop().await;
}

#[tokio::test]
async fn test_last_device_error_wins_and_persists() {
    let h = Harness::manual();
    h.call.join("A1", "room1").await.unwrap();

    h.capture.fail_next(DeviceError::PermissionDenied(TrackKind::Audio));
    let result = h.call.toggle_device(TrackKind::Audio).await;
    assert!(matches!(
        result,
        Err(CallError::Device(DeviceError::PermissionDenied(TrackKind::Audio)))
    ));

    let view = h.call.snapshot().await.unwrap();
    assert!(!view.mic.on);
    assert_eq!(
        view.error.as_deref(),
        Some("Microphone error: permission denied for microphone")
    );

    // A later success does not clear the message
    h.call.toggle_device(TrackKind::Video).await.unwrap();
    let view = h.call.snapshot().await.unwrap();
    assert!(view.camera.on);
    assert_eq!(
        view.error.as_deref(),
        Some("Microphone error: permission denied for microphone")
    );

    h.capture.set_unavailable(TrackKind::Video, true);
    h.call.toggle_device(TrackKind::Video).await.unwrap();
    let result = h.call.toggle_device(TrackKind::Video).await;
    assert!(result.is_err());
    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.error.as_deref(), Some("Camera error: no camera found"));

    h.stop().await;
}

#[tokio::test]
async fn test_devices_enable_on_join_by_default() {
    let h = Harness::start(CallConfig::default());
    let capture = h.capture.clone();

    h.call.join("A1", "room1").await.unwrap();

    let view = h.call.snapshot().await.unwrap();
    assert!(view.mic.on && view.mic.published);
    assert!(view.camera.on && view.camera.published);
    assert_eq!(h.transport.published().len(), 2);

    // Only the camera is rendered locally
    assert_eq!(h.sink.attached().len(), 1);

    h.stop().await;
    assert_eq!(capture.live_handles(TrackKind::Audio), 0);
    assert_eq!(capture.live_handles(TrackKind::Video), 0);
}

#[tokio::test]
async fn test_missing_microphone_still_joins() {
    let h = Harness::start(CallConfig::default());
    h.capture.fail_next(DeviceError::NotFound(TrackKind::Audio));

    h.call.join("A1", "room1").await.unwrap();

    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.status, ConnectionStatus::Connected);
    assert!(!view.mic.on);
    assert!(view.camera.on);
    assert_eq!(view.error.as_deref(), Some("Microphone error: no microphone found"));

    h.stop().await;
}

#[tokio::test]
async fn test_join_failure_reports_and_allows_retry() {
    let h = Harness::manual();
    h.transport
        .fail_next_join(TransportError::InvalidCredentials("bad app id".to_string()));

    let result = h.call.join("A1", "room1").await;
    assert!(matches!(result, Err(CallError::Join(_))));

    let view = h.call.snapshot().await.unwrap();
    assert_eq!(view.status, ConnectionStatus::Disconnected);
    assert_eq!(
        view.error.as_deref(),
        Some("Join error: invalid credentials: bad app id")
    );

    h.call.join("A1", "room1").await.unwrap();
    assert_eq!(h.call.status(), ConnectionStatus::Connected);

    h.stop().await;
}

#[tokio::test]
async fn test_connection_loss_tears_down_the_call() {
    let h = Harness::manual();
    let mut notifications = h.call.subscribe();

    h.call.join("A1", "room1").await.unwrap();
    h.call.toggle_device(TrackKind::Audio).await.unwrap();
    assert_eq!(h.capture.live_handles(TrackKind::Audio), 1);

    h.transport.drop_connection("timeout");
    wait_for(&mut notifications, |n| {
        matches!(n, CallNotification::StatusChanged(ConnectionStatus::Disconnected))
    })
    .await;

    let view = h.call.snapshot().await.unwrap();
    assert!(view.tiles.is_empty());
    assert!(!view.mic.on);
    assert_eq!(view.error.as_deref(), Some("Join error: connection lost: timeout"));
    assert_eq!(h.capture.live_handles(TrackKind::Audio), 0);

    h.stop().await;
}

#[tokio::test]
async fn test_shutdown_releases_devices() {
    let h = Harness::manual();
    let capture = h.capture.clone();

    h.call.join("A1", "room1").await.unwrap();
    h.call.toggle_device(TrackKind::Audio).await.unwrap();
    h.call.toggle_device(TrackKind::Video).await.unwrap();

    let call = h.call.clone();
    h.stop().await;

    assert_eq!(capture.live_handles(TrackKind::Audio), 0);
    assert_eq!(capture.live_handles(TrackKind::Video), 0);
    assert!(matches!(call.snapshot().await, Err(CallError::ControllerClosed)));
}
