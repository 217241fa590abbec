//! Background-music slot
//!
//! At most one music track plays at a time. Starting a new track while one
//! is playing fades the old one out over a fixed short duration while the
//! new track fades in, so swaps read as a crossfade. The slot only tracks
//! which active instance currently owns the music role; the fades
//! themselves ride the engine's ordinary per-instance ramps.

use crate::engine::InstanceId;

/// Crossfade applied to the outgoing track when music is swapped, seconds.
pub const MUSIC_SWAP_FADE: f32 = 0.8;

/// Bookkeeping for the single background-music instance.
#[derive(Debug, Default)]
pub struct MusicSlot {
    current: Option<InstanceId>,
}

impl MusicSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance currently holding the music role, if any.
    pub fn current(&self) -> Option<InstanceId> {
        self.current
    }

    /// Take ownership of the outgoing track, emptying the slot.
    pub fn take(&mut self) -> Option<InstanceId> {
        self.current.take()
    }

    /// Install a new track in the slot.
    pub fn set(&mut self, instance: Option<InstanceId>) {
        self.current = instance;
    }

    /// Empty the slot if `instance` owns it. Called when an instance is
    /// stopped, evicted or completes, so the slot never dangles.
    pub fn clear_if(&mut self, instance: InstanceId) {
        if self.current == Some(instance) {
            self.current = None;
        }
    }

    /// Whether a track currently owns the slot.
    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_lifecycle() {
        let mut slot = MusicSlot::new();
        assert!(!slot.is_occupied());

        slot.set(Some(InstanceId(7)));
        assert_eq!(slot.current(), Some(InstanceId(7)));

        let old = slot.take();
        assert_eq!(old, Some(InstanceId(7)));
        assert!(!slot.is_occupied());
    }

    #[test]
    fn test_clear_if_only_matches_owner() {
        let mut slot = MusicSlot::new();
        slot.set(Some(InstanceId(3)));

        slot.clear_if(InstanceId(4));
        assert!(slot.is_occupied());

        slot.clear_if(InstanceId(3));
        assert!(!slot.is_occupied());
    }
}
