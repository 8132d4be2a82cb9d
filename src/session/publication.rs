//! Publication manager
//!
//! Keeps the set of published local tracks in line with the live local
//! tracks. Nothing is published before the session is connected; the
//! coordinator calls `sync` again on every status change and device change.

use super::state::ConnectionStatus;
use crate::capture::{TrackId, TrackKind, TrackRef};
use crate::transport::SignalingTransport;
use crate::utils::error::TransportError;

#[derive(Debug, Default)]
pub struct PublicationManager {
    published: Vec<TrackRef>,
    /// Tracks whose publish failed; not retried until the handle changes
    failed: Vec<TrackId>,
}

impl PublicationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `ready` tracks not yet published and unpublish published
    /// tracks that are no longer ready.
    pub async fn sync(
        &mut self,
        transport: &dyn SignalingTransport,
        status: ConnectionStatus,
        ready: &[TrackRef],
    ) -> Result<(), TransportError> {
        if status != ConnectionStatus::Connected {
            if !ready.is_empty() {
                tracing::debug!("Deferring publish of {} track(s) until connected", ready.len());
            }
            return Ok(());
        }

        self.failed.retain(|id| ready.iter().any(|t| &t.id == id));

        let stale: Vec<TrackRef> = self
            .published
            .iter()
            .filter(|track| !ready.contains(track))
            .cloned()
            .collect();
        if !stale.is_empty() {
            if let Err(e) = transport.unpublish(&stale).await {
                tracing::warn!("Failed to unpublish {} track(s): {}", stale.len(), e);
            }
            self.published.retain(|track| !stale.contains(track));
        }

        let fresh: Vec<TrackRef> = ready
            .iter()
            .filter(|track| !self.published.contains(track) && !self.failed.contains(&track.id))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }

        match transport.publish(&fresh).await {
            Ok(()) => {
                tracing::info!("Published {} local track(s)", fresh.len());
                self.published.extend(fresh);
                Ok(())
            }
            Err(e) => {
                self.failed.extend(fresh.into_iter().map(|track| track.id));
                Err(e)
            }
        }
    }

    pub fn published(&self) -> &[TrackRef] {
        &self.published
    }

    pub fn is_published(&self, kind: TrackKind) -> bool {
        self.published.iter().any(|track| track.kind == kind)
    }

    /// Forget all publications (the transport drops them on leave)
    pub fn reset(&mut self) {
        self.published.clear();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::loopback::LoopbackTransport;
    use crate::session::state::ClientOptions;

    fn track(id: &str, kind: TrackKind) -> TrackRef {
        TrackRef::new(TrackId::new(id), kind)
    }

    #[tokio::test]
    async fn test_publish_deferred_until_connected() {
        let (transport, _events) = LoopbackTransport::new(ClientOptions::default());
        let mut manager = PublicationManager::new();
        let ready = vec![track("mic", TrackKind::Audio)];

        manager.sync(&transport, ConnectionStatus::Joining, &ready).await.unwrap();
        assert!(manager.published().is_empty());
        assert_eq!(transport.publish_calls(), 0);

        transport.join("A1", "room1", None).await.unwrap();
        manager.sync(&transport, ConnectionStatus::Connected, &ready).await.unwrap();
        assert!(manager.is_published(TrackKind::Audio));
        assert_eq!(transport.published(), ready);
    }

    #[tokio::test]
    async fn test_released_track_is_unpublished() {
        let (transport, _events) = LoopbackTransport::new(ClientOptions::default());
        transport.join("A1", "room1", None).await.unwrap();
        let mut manager = PublicationManager::new();

        let both = vec![track("mic", TrackKind::Audio), track("cam", TrackKind::Video)];
        manager.sync(&transport, ConnectionStatus::Connected, &both).await.unwrap();
        assert_eq!(transport.published().len(), 2);

        let audio_only = vec![track("mic", TrackKind::Audio)];
        manager.sync(&transport, ConnectionStatus::Connected, &audio_only).await.unwrap();
        assert!(!manager.is_published(TrackKind::Video));
        assert_eq!(transport.published(), audio_only);
    }

    #[tokio::test]
    async fn test_failed_publish_not_retried_for_same_handle() {
        let (transport, _events) = LoopbackTransport::new(ClientOptions::default());
        transport.join("A1", "room1", None).await.unwrap();
        transport.fail_next_publish(TransportError::Rejected("quota".to_string()));
        let mut manager = PublicationManager::new();

        let ready = vec![track("cam", TrackKind::Video)];
        let err = manager
            .sync(&transport, ConnectionStatus::Connected, &ready)
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Rejected("quota".to_string()));
        assert!(manager.published().is_empty());

        manager.sync(&transport, ConnectionStatus::Connected, &ready).await.unwrap();
        assert_eq!(transport.publish_calls(), 1);

        // A fresh handle for the same device is published
        let ready = vec![track("cam-2", TrackKind::Video)];
        manager.sync(&transport, ConnectionStatus::Connected, &ready).await.unwrap();
        assert!(manager.is_published(TrackKind::Video));
    }
}
