//! # Coinchime
//!
//! UI sound engine for the Coinchime family-finance app: pooled sample
//! playback with procedural-synthesis fallback, layered presets, timed
//! sequences, crossfaded background music and a best-effort convolution
//! reverb.
//!
//! ## Design
//!
//! - **Never breaks the host.** Missing assets synthesize, refused playback
//!   becomes a diagnostic event, and no playback call returns an error.
//! - **Explicit lifecycle.** The engine is constructed by the application's
//!   composition root and injected into consumers; `dispose` tears it down.
//! - **Frame-driven time.** Delays, fades and sequences advance in
//!   [`SoundEngine::update`]; every public call returns synchronously.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coinchime::prelude::*;
//!
//! fn main() -> Result<(), coinchime::AudioError> {
//!     let backend = coinchime::backend::create_backend(&Default::default())?;
//!     let store = Box::new(DirStore::new("assets"));
//!     let mut sounds = SoundEngine::new(EngineConfig::default(), backend, store)?;
//!
//!     sounds.preload_all();
//!     sounds.play(SoundId::CoinDrop);
//!     sounds.play_preset("achievement-unlock");
//!
//!     // Per frame:
//!     sounds.update(1.0 / 60.0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]
// Sample math casts between f32 and integer widths constantly.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

pub mod backend;
pub mod compose;
pub mod diagnostics;
pub mod effects;
pub mod engine;
pub mod mixer;
pub mod music;
pub mod pool;
pub mod prefs;
pub mod registry;
pub mod sample;
pub mod store;
pub mod synth;

mod error;

pub use error::AudioError;

/// Common imports for engine users
pub mod prelude {
    pub use crate::compose::{PresetEntry, SequenceEntry};
    pub use crate::diagnostics::Diagnostic;
    pub use crate::engine::{EngineConfig, InstanceId, PlaybackOptions, SoundEngine};
    pub use crate::pool::PoolGrowthPolicy;
    pub use crate::registry::{SoundCategory, SoundId};
    pub use crate::store::{AssetStore, DirStore};
    pub use crate::AudioError;
}
