//! Walks the sound engine through its paces: preload, single sounds,
//! presets, a sequence, a music crossfade, then teardown.
//!
//! Run with real assets in `./assets`, or without any: every sound then
//! falls back to a synthesized tone, which is the point of the exercise.

use std::time::{Duration, Instant};

use coinchime::backend::mock_backend::MockBackend;
use coinchime::backend::{create_backend, AudioBackend, AudioBackendConfig};
use coinchime::prelude::*;

const FRAME: Duration = Duration::from_millis(16);

fn main() -> Result<(), AudioError> {
    env_logger::init();

    // Prefer the platform backend; stay silent (but alive) without one.
    let backend: Box<dyn AudioBackend> = match create_backend(&AudioBackendConfig::default()) {
        Ok(backend) => backend,
        Err(e) => {
            log::warn!("no audio device ({e}); continuing with the mock backend");
            let mut mock = MockBackend::new();
            mock.initialize(&AudioBackendConfig::default())?;
            Box::new(mock)
        }
    };

    let store = Box::new(DirStore::new("assets"));
    let mut sounds = SoundEngine::new(EngineConfig::default(), backend, store)?;

    let loaded = sounds.preload_all();
    log::info!("preloaded {loaded} sounds; the rest will synthesize");

    sounds.play(SoundId::CoinDrop);
    run_for(&mut sounds, 0.5);

    sounds.play_group("click", PlaybackOptions::default());
    run_for(&mut sounds, 0.5);

    log::info!("preset: achievement-unlock");
    sounds.play_preset("achievement-unlock");
    run_for(&mut sounds, 1.5);

    log::info!("sequence: three coins");
    sounds.play_sequence(vec![
        SequenceEntry::new(SoundId::CoinDrop, 0.0),
        SequenceEntry::new(SoundId::CoinClink, 0.2),
        SequenceEntry::new(SoundId::CashRegister, 0.4),
    ]);
    run_for(&mut sounds, 1.5);

    log::info!("music: sunnyside, then crossfade to arcade");
    sounds.play_music(SoundId::ThemeSunnyside, 1.0);
    run_for(&mut sounds, 3.0);
    sounds.play_music(SoundId::ThemeArcade, 1.0);
    run_for(&mut sounds, 3.0);
    sounds.stop_music(1.0);
    run_for(&mut sounds, 1.5);

    sounds.dispose();
    Ok(())
}

/// Pump the engine clock for `seconds` of wall time.
fn run_for(sounds: &mut SoundEngine, seconds: f32) {
    let start = Instant::now();
    let mut last = start;
    while start.elapsed().as_secs_f32() < seconds {
        std::thread::sleep(FRAME);
        let now = Instant::now();
        sounds.update(now.duration_since(last).as_secs_f32());
        last = now;
    }
}
