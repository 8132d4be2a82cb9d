//! Scoped track bindings
//!
//! A binding attaches a track to a render target for exactly as long as the
//! binding value lives. Dropping it detaches, on every exit path.

use super::sink::{RenderSink, RenderTarget};
use crate::capture::TrackRef;
use crate::utils::error::RenderError;
use std::sync::Arc;

/// An attached track. Detaches from the sink on drop.
#[must_use = "dropping a binding stops rendering immediately"]
pub struct ScopedBinding {
    sink: Arc<dyn RenderSink>,
    track: TrackRef,
    target: RenderTarget,
}

impl ScopedBinding {
    /// Attach `track` to `target` and start rendering
    pub fn bind(
        sink: &Arc<dyn RenderSink>,
        track: TrackRef,
        target: RenderTarget,
    ) -> Result<Self, RenderError> {
        sink.attach(&track, &target)?;
        tracing::debug!("Bound {} track {} to {:?}", track.kind, track.id, target);
        Ok(Self {
            sink: Arc::clone(sink),
            track,
            target,
        })
    }

    pub fn track(&self) -> &TrackRef {
        &self.track
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }
}

impl Drop for ScopedBinding {
    fn drop(&mut self) {
        self.sink.detach(&self.track);
        tracing::debug!("Unbound {} track {}", self.track.kind, self.track.id);
    }
}

impl std::fmt::Debug for ScopedBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedBinding")
            .field("track", &self.track)
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::loopback::MemorySink;
    use crate::capture::{TrackId, TrackKind};
    use crate::render::TileKey;

    fn video_track(id: &str) -> TrackRef {
        TrackRef::new(TrackId::new(id), TrackKind::Video)
    }

    #[test]
    fn test_binding_detaches_on_drop() {
        let memory = Arc::new(MemorySink::new());
        let sink: Arc<dyn RenderSink> = memory.clone();

        let binding = ScopedBinding::bind(
            &sink,
            video_track("cam"),
            RenderTarget::Surface(TileKey::Local),
        )
        .unwrap();
        assert!(memory.is_attached(&TrackId::new("cam")));
        assert_eq!(binding.target(), &RenderTarget::Surface(TileKey::Local));

        drop(binding);
        assert!(!memory.is_attached(&TrackId::new("cam")));
    }

    #[test]
    fn test_binding_released_when_scope_unwinds() {
        let memory = Arc::new(MemorySink::new());
        let sink: Arc<dyn RenderSink> = memory.clone();

        let result: Result<(), &str> = (|| {
            let _binding = ScopedBinding::bind(&sink, video_track("cam"), RenderTarget::AudioOutput)
                .map_err(|_| "bind failed")?;
            Err("later step failed")
        })();

        assert!(result.is_err());
        assert!(memory.attached().is_empty());
        assert_eq!(memory.detach_count(), 1);
    }

    #[test]
    fn test_failed_attach_yields_no_binding() {
        let memory = Arc::new(MemorySink::new());
        memory.fail_next_attach("surface gone");
        let sink: Arc<dyn RenderSink> = memory.clone();

        let err = ScopedBinding::bind(&sink, video_track("cam"), RenderTarget::AudioOutput).unwrap_err();
        assert_eq!(err.track, TrackId::new("cam"));
        assert!(memory.attached().is_empty());
        assert_eq!(memory.detach_count(), 0);
    }
}
