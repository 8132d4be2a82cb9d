//! Call coordinator
//!
//! Drives one call: join and leave against the signaling layer, local device
//! toggles, publication, the remote participant registry, render bindings and
//! the user-visible error.

use super::aggregator::ErrorAggregator;
use super::events::{CallEvent, CallNotification};
use super::publication::PublicationManager;
use super::registry::ParticipantRegistry;
use super::state::{CallConfig, ConnectionStatus, JoinForm, Session};
use crate::capture::{DeviceCapture, DeviceChange, DeviceTrackProvider, TrackKind};
use crate::render::{RenderGrid, RenderSink};
use crate::transport::{ParticipantId, SignalingTransport, TransportEvent};
use crate::utils::error::{CallError, CallResult, UiError};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct CallCoordinator {
    config: CallConfig,

    /// Current connection status, readable from outside the event loop
    status: Arc<RwLock<ConnectionStatus>>,

    /// The active session, at most one
    session: Option<Session>,

    /// Last submitted join form
    form: JoinForm,

    transport: Arc<dyn SignalingTransport>,

    // Declared before `devices`: render bindings are dropped before the
    // tracks they show.
    grid: RenderGrid,

    devices: DeviceTrackProvider,

    publications: PublicationManager,

    registry: ParticipantRegistry,

    errors: ErrorAggregator,

    /// Pending events, processed front to back
    queue: VecDeque<CallEvent>,

    event_tx: broadcast::Sender<CallNotification>,
}

impl CallCoordinator {
    pub fn new(
        config: CallConfig,
        transport: Arc<dyn SignalingTransport>,
        capture: Arc<dyn DeviceCapture>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let form = JoinForm::new(config.app_id.clone(), String::new());
        Self {
            config,
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            session: None,
            form,
            transport,
            grid: RenderGrid::new(sink),
            devices: DeviceTrackProvider::new(capture),
            publications: PublicationManager::new(),
            registry: ParticipantRegistry::new(),
            errors: ErrorAggregator::new(),
            queue: VecDeque::new(),
            event_tx,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Shared view of the connection status
    pub fn status_handle(&self) -> Arc<RwLock<ConnectionStatus>> {
        Arc::clone(&self.status)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn form(&self) -> &JoinForm {
        &self.form
    }

    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    pub fn devices(&self) -> &DeviceTrackProvider {
        &self.devices
    }

    pub fn publications(&self) -> &PublicationManager {
        &self.publications
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn grid(&self) -> &RenderGrid {
        &self.grid
    }

    pub fn errors(&self) -> &ErrorAggregator {
        &self.errors
    }

    /// Subscribe to call notifications
    pub fn subscribe(&self) -> broadcast::Receiver<CallNotification> {
        self.event_tx.subscribe()
    }

    pub(crate) fn notifier(&self) -> broadcast::Sender<CallNotification> {
        self.event_tx.clone()
    }

    /// Join `channel` under `app_id`
    pub async fn join(&mut self, app_id: &str, channel: &str) -> CallResult<()> {
        self.dispatch(CallEvent::JoinRequested {
            app_id: app_id.to_string(),
            channel: channel.to_string(),
        })
        .await
    }

    /// Leave the channel. A no-op when already disconnected.
    pub async fn leave(&mut self) {
        // Teardown never fails; errors are logged along the way
        let _ = self.dispatch(CallEvent::LeaveRequested).await;
    }

    pub async fn set_device_enabled(&mut self, kind: TrackKind, enabled: bool) -> CallResult<()> {
        self.dispatch(CallEvent::DeviceToggled { kind, enabled }).await
    }

    /// Flip the enabled flag of a device
    pub async fn toggle_device(&mut self, kind: TrackKind) -> CallResult<()> {
        let enabled = !self.devices.is_enabled(kind);
        self.set_device_enabled(kind, enabled).await
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        // Remote notifications only fail through the error aggregator
        let _ = self.dispatch(event.into()).await;
    }

    /// Queue `event` and process the queue until it is empty.
    ///
    /// Returns the first error produced while draining; later events are
    /// still processed.
    pub async fn dispatch(&mut self, event: CallEvent) -> CallResult<()> {
        self.queue.push_back(event);

        let mut outcome = Ok(());
        while let Some(event) = self.queue.pop_front() {
            tracing::debug!("Dispatching {:?} (status {:?})", event, self.status());
            if let Err(e) = self.handle(event).await {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        outcome
    }

    async fn handle(&mut self, event: CallEvent) -> CallResult<()> {
        match event {
            CallEvent::JoinRequested { app_id, channel } => self.on_join_requested(app_id, channel).await,
            CallEvent::JoinSucceeded { local_uid } => {
                self.on_join_succeeded(local_uid).await;
                Ok(())
            }
            CallEvent::JoinFailed { error } => {
                self.errors.report(UiError::join(&error));
                self.notify_error();
                self.session = None;
                self.set_status(ConnectionStatus::Disconnected);
                Err(CallError::Join(error))
            }
            CallEvent::LeaveRequested => {
                if self.status() == ConnectionStatus::Disconnected {
                    tracing::debug!("Leave requested while disconnected; nothing to do");
                } else {
                    self.teardown().await;
                }
                Ok(())
            }
            CallEvent::DeviceToggled { kind, enabled } => self.on_device_toggled(kind, enabled).await,
            CallEvent::DeviceAutoEnabled { kind } => {
                // Already reported and broadcast; the join itself succeeded
                if let Err(e) = self.on_device_toggled(kind, true).await {
                    tracing::warn!("Could not enable {} on join: {}", kind.device_label(), e);
                }
                Ok(())
            }
            CallEvent::ParticipantJoined { participant } => {
                self.on_participant_joined(participant);
                Ok(())
            }
            CallEvent::ParticipantLeft { participant } => {
                if let Some(removed) = self.registry.remove(&participant) {
                    self.grid.remove_participant(&removed.id);
                    tracing::info!("Participant {} left", removed.id);
                    let _ = self.event_tx.send(CallNotification::ParticipantRemoved(removed.id));
                }
                Ok(())
            }
            CallEvent::TrackPublished { participant, track } => {
                if !self.accepts_remote_events() {
                    return Ok(());
                }
                let (entry, inserted) = self.registry.set_track(&participant, track);
                self.grid.sync_participant(entry);
                if inserted {
                    tracing::info!("Participant {} joined", participant);
                    let _ = self.event_tx.send(CallNotification::ParticipantAdded(participant));
                }
                Ok(())
            }
            CallEvent::TrackUnpublished { participant, kind } => {
                if let Some(entry) = self.registry.clear_track(&participant, kind) {
                    self.grid.sync_participant(entry);
                }
                Ok(())
            }
            CallEvent::PublishFailed { error } => {
                // The session stays up
                self.errors.report(UiError::publish(&error));
                self.notify_error();
                Ok(())
            }
            CallEvent::ConnectionLost { reason } => {
                if self.status() != ConnectionStatus::Disconnected {
                    self.errors.report(UiError::connection_lost(&reason));
                    self.notify_error();
                    self.teardown().await;
                }
                Ok(())
            }
        }
    }

    async fn on_join_requested(&mut self, app_id: String, channel: String) -> CallResult<()> {
        let form = JoinForm::new(app_id.clone(), channel.clone());
        let idle = self.status() == ConnectionStatus::Disconnected;

        // The form keeps the values of the session actually in use
        if idle {
            self.form = form.clone();
        }

        if !form.can_submit() {
            self.errors.report(UiError::missing_join_parameters());
            self.notify_error();
            return Err(CallError::MissingJoinParameters);
        }

        if !idle {
            tracing::warn!("Join requested for '{}' while a session is active", channel);
            return Err(CallError::SessionActive);
        }

        tracing::info!("Joining channel '{}'", channel);
        self.session = Some(Session::new(app_id.clone(), channel.clone()));
        self.set_status(ConnectionStatus::Joining);

        let token = self.config.token.clone();
        let event = match self.transport.join(&app_id, &channel, token.as_deref()).await {
            Ok(local_uid) => CallEvent::JoinSucceeded { local_uid },
            Err(error) => CallEvent::JoinFailed { error },
        };
        self.queue.push_back(event);
        Ok(())
    }

    async fn on_join_succeeded(&mut self, local_uid: ParticipantId) {
        if self.status() != ConnectionStatus::Joining {
            tracing::debug!("Ignoring join acknowledgement for {} (no join pending)", local_uid);
            return;
        }

        if let Some(session) = self.session.as_mut() {
            tracing::info!("Joined channel '{}' as {}", session.channel, local_uid);
            session.mark_connected(local_uid);
        }
        self.set_status(ConnectionStatus::Connected);

        // Whatever was captured before the join shows and publishes now
        self.grid.sync_local(self.devices.track(TrackKind::Video));
        self.sync_publications(None).await;

        for (kind, wanted) in [
            (TrackKind::Audio, self.config.mic_on_join),
            (TrackKind::Video, self.config.camera_on_join),
        ] {
            if wanted && !self.devices.is_enabled(kind) {
                self.queue.push_back(CallEvent::DeviceAutoEnabled { kind });
            }
        }
    }

    async fn on_device_toggled(&mut self, kind: TrackKind, enabled: bool) -> CallResult<()> {
        let connected = self.status() == ConnectionStatus::Connected;

        if !enabled {
            // Stop rendering and publishing before the handle goes away
            if connected && kind == TrackKind::Video {
                self.grid.sync_local(None);
            }
            self.sync_publications(Some(kind)).await;
        }

        match self.devices.set_enabled(kind, enabled).await {
            Ok(DeviceChange::Unchanged) => Ok(()),
            Ok(DeviceChange::Acquired(track)) => {
                if connected && kind == TrackKind::Video {
                    self.grid.sync_local(Some(&track));
                }
                self.sync_publications(None).await;
                let _ = self.event_tx.send(CallNotification::DeviceChanged { kind, enabled: true });
                Ok(())
            }
            Ok(DeviceChange::Released(_)) => {
                let _ = self.event_tx.send(CallNotification::DeviceChanged { kind, enabled: false });
                Ok(())
            }
            Err(e) => {
                self.errors.report(UiError::device(&e));
                self.notify_error();
                let _ = self.event_tx.send(CallNotification::DeviceChanged { kind, enabled: false });
                Err(e.into())
            }
        }
    }

    fn on_participant_joined(&mut self, participant: ParticipantId) {
        if !self.accepts_remote_events() {
            return;
        }
        if self.registry.upsert(&participant) {
            if let Some(entry) = self.registry.get(&participant) {
                self.grid.sync_participant(entry);
            }
            tracing::info!("Participant {} joined", participant);
            let _ = self.event_tx.send(CallNotification::ParticipantAdded(participant));
        }
    }

    fn accepts_remote_events(&self) -> bool {
        let connected = self.status() == ConnectionStatus::Connected;
        if !connected {
            tracing::debug!("Ignoring remote notification while {:?}", self.status());
        }
        connected
    }

    /// Publish live local tracks, leaving out `excluded`
    async fn sync_publications(&mut self, excluded: Option<TrackKind>) {
        let ready: Vec<_> = self
            .devices
            .tracks()
            .into_iter()
            .filter(|track| Some(track.kind) != excluded)
            .collect();
        let status = self.status();

        if let Err(error) = self
            .publications
            .sync(self.transport.as_ref(), status, &ready)
            .await
        {
            self.queue.push_back(CallEvent::PublishFailed { error });
        }
    }

    /// End the session and release everything it held
    async fn teardown(&mut self) {
        if let Some(session) = &self.session {
            tracing::info!("Leaving channel '{}'", session.channel);
        }

        self.grid.clear();

        if let Err(e) = self.transport.leave().await {
            tracing::warn!("Transport leave failed: {}", e);
        }
        self.publications.reset();

        for track in self.devices.release_all() {
            let _ = self.event_tx.send(CallNotification::DeviceChanged {
                kind: track.kind,
                enabled: false,
            });
        }

        self.registry.clear();
        self.session = None;
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous == status {
            return;
        }

        tracing::info!("Call status: {:?} -> {:?}", previous, status);
        if let Some(session) = self.session.as_mut() {
            session.status = status;
        }
        let _ = self.event_tx.send(CallNotification::StatusChanged(status));
    }

    fn notify_error(&self) {
        if let Some(error) = self.errors.current() {
            let _ = self.event_tx.send(CallNotification::Error(error.clone()));
        }
    }
}
