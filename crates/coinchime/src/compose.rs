//! Composition layer: groups, presets, sequences
//!
//! Groups name interchangeable variants (randomized clicks), presets name
//! layered composites that read as one semantic event, and sequences are
//! strictly time-ordered chains. Preset delays are relative offsets all
//! scheduled at call time; sequence delays gate each entry in turn.

use std::collections::{HashMap, VecDeque};

use crate::registry::SoundId;

/// One member of a preset: a sound with its own offset, gain and pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetEntry {
    /// The sound to layer
    pub sound: SoundId,
    /// Call volume for this member
    pub volume: f32,
    /// Offset from the preset trigger, seconds
    pub delay: f32,
    /// Optional playback-rate multiplier
    pub pitch: Option<f32>,
}

impl PresetEntry {
    /// Entry at the given offset with default pitch.
    pub fn new(sound: SoundId, volume: f32, delay: f32) -> Self {
        Self {
            sound,
            volume,
            delay,
            pitch: None,
        }
    }

    /// Set the playback-rate multiplier.
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }
}

/// A named layered composite. Static configuration, never mutated at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetDefinition {
    /// Members, scheduled together with their relative delays
    pub entries: Vec<PresetEntry>,
}

/// Lookup table of presets by name.
pub struct PresetTable {
    map: HashMap<String, PresetDefinition>,
}

impl PresetTable {
    /// The built-in presets for the hosting app's reward events.
    pub fn with_defaults() -> Self {
        let mut map = HashMap::new();
        map.insert(
            "achievement-unlock".to_string(),
            PresetDefinition {
                entries: vec![
                    PresetEntry::new(SoundId::Fanfare, 1.0, 0.0),
                    PresetEntry::new(SoundId::Sparkle, 0.7, 0.2),
                    PresetEntry::new(SoundId::CoinClink, 0.8, 0.4),
                ],
            },
        );
        map.insert(
            "goal-reached".to_string(),
            PresetDefinition {
                entries: vec![
                    PresetEntry::new(SoundId::GoalMilestone, 1.0, 0.0),
                    PresetEntry::new(SoundId::Sparkle, 0.6, 0.15),
                    PresetEntry::new(SoundId::Fanfare, 0.9, 0.3),
                ],
            },
        );
        map.insert(
            "chore-complete".to_string(),
            PresetDefinition {
                entries: vec![
                    PresetEntry::new(SoundId::ChoreDone, 1.0, 0.0),
                    PresetEntry::new(SoundId::CoinDrop, 0.8, 0.25),
                ],
            },
        );
        map.insert(
            "piggy-payday".to_string(),
            PresetDefinition {
                entries: vec![
                    PresetEntry::new(SoundId::CoinDrop, 0.9, 0.0),
                    PresetEntry::new(SoundId::CoinDrop, 0.9, 0.12).with_pitch(1.1),
                    PresetEntry::new(SoundId::CoinDrop, 0.9, 0.24).with_pitch(1.2),
                    PresetEntry::new(SoundId::CashRegister, 1.0, 0.5),
                ],
            },
        );
        map.insert(
            "lesson-complete".to_string(),
            PresetDefinition {
                entries: vec![
                    PresetEntry::new(SoundId::Success, 1.0, 0.0),
                    PresetEntry::new(SoundId::Sparkle, 0.5, 0.2),
                ],
            },
        );
        Self { map }
    }

    /// Look up a preset by name.
    pub fn get(&self, name: &str) -> Option<&PresetDefinition> {
        self.map.get(name)
    }

    /// Register or replace a preset.
    pub fn insert<S: Into<String>>(&mut self, name: S, preset: PresetDefinition) {
        self.map.insert(name.into(), preset);
    }
}

/// Lookup table of interchangeable-variant groups by name.
pub struct GroupTable {
    map: HashMap<String, Vec<SoundId>>,
}

impl GroupTable {
    /// The built-in variant groups.
    pub fn with_defaults() -> Self {
        let mut map = HashMap::new();
        map.insert(
            "click".to_string(),
            vec![SoundId::ClickA, SoundId::ClickB, SoundId::ClickC],
        );
        map.insert(
            "coin".to_string(),
            vec![SoundId::CoinDrop, SoundId::CoinClink],
        );
        Self { map }
    }

    /// Look up a group's members.
    pub fn get(&self, name: &str) -> Option<&[SoundId]> {
        self.map.get(name).map(Vec::as_slice)
    }

    /// Register or replace a group.
    pub fn insert<S: Into<String>>(&mut self, name: S, members: Vec<SoundId>) {
        self.map.insert(name.into(), members);
    }
}

/// One step of a timed sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceEntry {
    /// The sound to trigger
    pub sound: SoundId,
    /// Seconds to wait before triggering this entry
    pub delay: f32,
    /// Call volume
    pub volume: f32,
}

impl SequenceEntry {
    /// Entry with full volume.
    pub fn new(sound: SoundId, delay: f32) -> Self {
        Self {
            sound,
            delay,
            volume: 1.0,
        }
    }
}

struct SequenceCursor {
    entries: VecDeque<SequenceEntry>,
    countdown: f32,
}

/// Advances in-flight sequences on the engine clock.
///
/// An entry's delay starts counting when the previous entry fires, which is
/// the strict-ordering guarantee: entry N+1 is never scheduled before entry
/// N's delay has fully elapsed.
#[derive(Default)]
pub(crate) struct SequenceRunner {
    cursors: Vec<SequenceCursor>,
}

impl SequenceRunner {
    /// Begin a sequence. Returns entries due immediately (leading zero
    /// delays fire at call time).
    pub fn start(&mut self, entries: Vec<SequenceEntry>) -> Vec<SequenceEntry> {
        let mut cursor = SequenceCursor {
            entries: entries.into(),
            countdown: 0.0,
        };
        if let Some(first) = cursor.entries.front() {
            cursor.countdown = first.delay;
        }
        let due = Self::drain_due(&mut cursor, 0.0);
        if !cursor.entries.is_empty() {
            self.cursors.push(cursor);
        }
        due
    }

    /// Advance all sequences by `dt`, returning entries that became due.
    pub fn advance(&mut self, dt: f32) -> Vec<SequenceEntry> {
        let mut due = Vec::new();
        for cursor in &mut self.cursors {
            due.extend(Self::drain_due(cursor, dt));
        }
        self.cursors.retain(|c| !c.entries.is_empty());
        due
    }

    /// Drop every in-flight sequence.
    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    /// Number of sequences still running.
    pub fn active(&self) -> usize {
        self.cursors.len()
    }

    fn drain_due(cursor: &mut SequenceCursor, dt: f32) -> Vec<SequenceEntry> {
        let mut due = Vec::new();
        let mut leftover = dt;
        // A large dt may cover several chained delays; cascade through them.
        while let Some(front) = cursor.entries.front() {
            if cursor.countdown > leftover {
                cursor.countdown -= leftover;
                break;
            }
            leftover -= cursor.countdown;
            let entry = *front;
            cursor.entries.pop_front();
            due.push(entry);
            cursor.countdown = cursor.entries.front().map_or(0.0, |next| next.delay);
        }
        due
    }
}
