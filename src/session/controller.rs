//! Call controller
//!
//! Runs a coordinator on its own task. UI commands and transport
//! notifications are handled strictly one at a time; a command sent while
//! another is in flight waits its turn.

use super::coordinator::CallCoordinator;
use super::events::CallNotification;
use super::state::ConnectionStatus;
use super::view::CallView;
use crate::capture::TrackKind;
use crate::transport::TransportEvent;
use crate::utils::error::{CallError, CallResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Requests from the UI
#[derive(Debug)]
pub enum CallCommand {
    Join {
        app_id: String,
        channel: String,
        reply: oneshot::Sender<CallResult<()>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
    SetDevice {
        kind: TrackKind,
        enabled: bool,
        reply: oneshot::Sender<CallResult<()>>,
    },
    ToggleDevice {
        kind: TrackKind,
        reply: oneshot::Sender<CallResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<CallView>,
    },
    Shutdown,
}

/// Cloneable front door to a running call
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::Sender<CallCommand>,
    notifications: broadcast::Sender<CallNotification>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl CallHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> CallCommand) -> CallResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| CallError::ControllerClosed)?;
        response.await.map_err(|_| CallError::ControllerClosed)
    }

    pub async fn join(&self, app_id: impl Into<String>, channel: impl Into<String>) -> CallResult<()> {
        let (app_id, channel) = (app_id.into(), channel.into());
        self.request(|reply| CallCommand::Join {
            app_id,
            channel,
            reply,
        })
        .await?
    }

    pub async fn leave(&self) -> CallResult<()> {
        self.request(|reply| CallCommand::Leave { reply }).await
    }

    pub async fn set_device_enabled(&self, kind: TrackKind, enabled: bool) -> CallResult<()> {
        self.request(|reply| CallCommand::SetDevice {
            kind,
            enabled,
            reply,
        })
        .await?
    }

    pub async fn toggle_device(&self, kind: TrackKind) -> CallResult<()> {
        self.request(|reply| CallCommand::ToggleDevice { kind, reply })
            .await?
    }

    pub async fn snapshot(&self) -> CallResult<CallView> {
        self.request(|reply| CallCommand::Snapshot { reply }).await
    }

    /// Current status without a round trip through the event loop
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallNotification> {
        self.notifications.subscribe()
    }

    /// Stop the event loop. The session is left and all resources released.
    pub async fn shutdown(&self) -> CallResult<()> {
        self.commands
            .send(CallCommand::Shutdown)
            .await
            .map_err(|_| CallError::ControllerClosed)
    }
}

pub struct CallController;

impl CallController {
    /// Move `coordinator` onto a task fed by UI commands and `events`
    pub fn spawn(
        coordinator: CallCoordinator,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (CallHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::channel(coordinator.config().event_capacity.max(1));
        let handle = CallHandle {
            commands,
            notifications: coordinator.notifier(),
            status: coordinator.status_handle(),
        };
        let task = tokio::spawn(run(coordinator, command_rx, events));
        (handle, task)
    }
}

async fn run(
    mut coordinator: CallCoordinator,
    mut commands: mpsc::Receiver<CallCommand>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    tracing::info!("Call controller started");

    loop {
        // Transport notifications already received go before the next command
        tokio::select! {
            biased;
            Some(event) = events.recv() => coordinator.handle_transport_event(event).await,
            command = commands.recv() => match command {
                Some(CallCommand::Shutdown) | None => break,
                Some(command) => handle_command(&mut coordinator, command).await,
            },
        }
    }

    coordinator.leave().await;
    tracing::info!("Call controller stopped");
}

async fn handle_command(coordinator: &mut CallCoordinator, command: CallCommand) {
    // A dropped reply receiver only means the caller stopped waiting
    match command {
        CallCommand::Join {
            app_id,
            channel,
            reply,
        } => {
            let _ = reply.send(coordinator.join(&app_id, &channel).await);
        }
        CallCommand::Leave { reply } => {
            coordinator.leave().await;
            let _ = reply.send(());
        }
        CallCommand::SetDevice {
            kind,
            enabled,
            reply,
        } => {
            let _ = reply.send(coordinator.set_device_enabled(kind, enabled).await);
        }
        CallCommand::ToggleDevice { kind, reply } => {
            let _ = reply.send(coordinator.toggle_device(kind).await);
        }
        CallCommand::Snapshot { reply } => {
            let _ = reply.send(CallView::capture(coordinator));
        }
        CallCommand::Shutdown => {}
    }
}
