//! Remote participant registry
//!
//! Live set of remote participants in arrival order. Entries are unique by
//! identity; duplicate joins and leaves are harmless.

use crate::capture::{TrackKind, TrackRef};
use crate::transport::ParticipantId;
use serde::{Deserialize, Serialize};

/// A remote participant and the tracks it currently publishes.
///
/// The tracks are references only; the media belongs to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteParticipant {
    pub id: ParticipantId,
    pub video: Option<TrackRef>,
    pub audio: Option<TrackRef>,
}

impl RemoteParticipant {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            video: None,
            audio: None,
        }
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut Option<TrackRef> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }
}

#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: Vec<RemoteParticipant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| &p.id == id)
    }

    fn entry(&mut self, id: &ParticipantId) -> (&mut RemoteParticipant, bool) {
        match self.position(id) {
            Some(index) => (&mut self.participants[index], false),
            None => {
                self.participants.push(RemoteParticipant::new(id.clone()));
                let last = self.participants.len() - 1;
                (&mut self.participants[last], true)
            }
        }
    }

    /// Insert `id` if absent. Returns true when a new entry was created.
    pub fn upsert(&mut self, id: &ParticipantId) -> bool {
        self.entry(id).1
    }

    /// Remove `id`. Absent identities are a no-op.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<RemoteParticipant> {
        self.position(id).map(|index| self.participants.remove(index))
    }

    /// Record a published track, inserting the participant if needed.
    /// Returns the updated entry and whether it was newly inserted.
    pub fn set_track(&mut self, id: &ParticipantId, track: TrackRef) -> (&RemoteParticipant, bool) {
        let kind = track.kind;
        let (participant, inserted) = self.entry(id);
        *participant.slot_mut(kind) = Some(track);
        (&*participant, inserted)
    }

    /// Forget the `kind` track of `id`
    pub fn clear_track(&mut self, id: &ParticipantId, kind: TrackKind) -> Option<&RemoteParticipant> {
        let index = self.position(id)?;
        let participant = &mut self.participants[index];
        *participant.slot_mut(kind) = None;
        Some(&*participant)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&RemoteParticipant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteParticipant> {
        self.participants.iter()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}
