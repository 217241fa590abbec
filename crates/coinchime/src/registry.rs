//! Static sound catalog
//!
//! Every sound the hosting app can trigger is a [`SoundId`] variant, so
//! call sites, the synthesis fallback table and the preset tables are all
//! checked against the same closed set at compile time. The catalog entry
//! for an id carries its asset locator, the number of handles to pool for
//! overlapping playback, and a category tag used for default gain.

use std::fmt;

/// Logical identifier for every sound the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundId {
    /// Primary UI click
    ClickA,
    /// Click variant (slightly brighter)
    ClickB,
    /// Click variant (slightly softer)
    ClickC,
    /// Soft tap for secondary controls
    Tap,
    /// Positive confirmation chirp
    Success,
    /// Action-refused buzz (e.g. spending more than the balance)
    Denied,
    /// Single coin landing in the jar
    CoinDrop,
    /// Two coins knocking together
    CoinClink,
    /// Cash-register "cha-ching" for completed transactions
    CashRegister,
    /// Chore marked done
    ChoreDone,
    /// Savings goal passed a milestone
    GoalMilestone,
    /// Short brass fanfare for big rewards
    Fanfare,
    /// Glittery shimmer layered under reward sounds
    Sparkle,
    /// Transition swoosh between screens
    Whoosh,
    /// Background theme: mellow daytime loop
    ThemeSunnyside,
    /// Background theme: upbeat arcade loop
    ThemeArcade,
}

impl SoundId {
    /// All catalog ids, in declaration order.
    pub fn all() -> &'static [SoundId] {
        &[
            SoundId::ClickA,
            SoundId::ClickB,
            SoundId::ClickC,
            SoundId::Tap,
            SoundId::Success,
            SoundId::Denied,
            SoundId::CoinDrop,
            SoundId::CoinClink,
            SoundId::CashRegister,
            SoundId::ChoreDone,
            SoundId::GoalMilestone,
            SoundId::Fanfare,
            SoundId::Sparkle,
            SoundId::Whoosh,
            SoundId::ThemeSunnyside,
            SoundId::ThemeArcade,
        ]
    }

    /// Stable lowercase name, used in log lines and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            SoundId::ClickA => "click-a",
            SoundId::ClickB => "click-b",
            SoundId::ClickC => "click-c",
            SoundId::Tap => "tap",
            SoundId::Success => "success",
            SoundId::Denied => "denied",
            SoundId::CoinDrop => "coin-drop",
            SoundId::CoinClink => "coin-clink",
            SoundId::CashRegister => "cash-register",
            SoundId::ChoreDone => "chore-done",
            SoundId::GoalMilestone => "goal-milestone",
            SoundId::Fanfare => "fanfare",
            SoundId::Sparkle => "sparkle",
            SoundId::Whoosh => "whoosh",
            SoundId::ThemeSunnyside => "theme-sunnyside",
            SoundId::ThemeArcade => "theme-arcade",
        }
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag controlling the default relative gain of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    /// Interface feedback (clicks, taps)
    Ui,
    /// State feedback (success, denied, transitions)
    Feedback,
    /// Reward and celebration sounds
    Reward,
    /// Background music themes
    Music,
}

impl SoundCategory {
    /// Default call volume for sounds in this category, used by
    /// [`crate::engine::SoundEngine::play`] when the caller does not pass
    /// explicit options.
    pub fn base_gain(self) -> f32 {
        match self {
            SoundCategory::Ui => 0.8,
            SoundCategory::Feedback => 0.9,
            SoundCategory::Reward | SoundCategory::Music => 1.0,
        }
    }
}

/// Where the asset bytes for a sound come from.
///
/// `Generated` names an asset produced by the content pipeline and published
/// to the store's generated-asset area; the store resolves the indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLocator {
    /// Relative path under the asset root
    Path(&'static str),
    /// Name of a pipeline-generated asset
    Generated(&'static str),
}

/// One catalog entry: everything needed to preload a sound.
#[derive(Debug, Clone, Copy)]
pub struct SoundSpec {
    /// The id this entry describes
    pub id: SoundId,
    /// Asset source
    pub locator: AssetLocator,
    /// Handles to create at preload, bounding zero-allocation overlap
    pub pool_size: usize,
    /// Gain/category tag
    pub category: SoundCategory,
}

/// Fallback pool size for ids without an explicit entry.
pub const DEFAULT_POOL_SIZE: usize = 2;

const CATALOG: &[SoundSpec] = &[
    SoundSpec {
        id: SoundId::ClickA,
        locator: AssetLocator::Path("sfx/click_a.ogg"),
        pool_size: 4,
        category: SoundCategory::Ui,
    },
    SoundSpec {
        id: SoundId::ClickB,
        locator: AssetLocator::Path("sfx/click_b.ogg"),
        pool_size: 4,
        category: SoundCategory::Ui,
    },
    SoundSpec {
        id: SoundId::ClickC,
        locator: AssetLocator::Path("sfx/click_c.ogg"),
        pool_size: 4,
        category: SoundCategory::Ui,
    },
    SoundSpec {
        id: SoundId::Tap,
        locator: AssetLocator::Path("sfx/tap.ogg"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Ui,
    },
    SoundSpec {
        id: SoundId::Success,
        locator: AssetLocator::Path("sfx/success.ogg"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Feedback,
    },
    SoundSpec {
        id: SoundId::Denied,
        locator: AssetLocator::Path("sfx/denied.ogg"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Feedback,
    },
    SoundSpec {
        id: SoundId::CoinDrop,
        locator: AssetLocator::Path("sfx/coin_drop.ogg"),
        pool_size: 6,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::CoinClink,
        locator: AssetLocator::Path("sfx/coin_clink.ogg"),
        pool_size: 6,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::CashRegister,
        locator: AssetLocator::Path("sfx/cash_register.ogg"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::ChoreDone,
        locator: AssetLocator::Path("sfx/chore_done.ogg"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::GoalMilestone,
        locator: AssetLocator::Path("sfx/goal_milestone.ogg"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::Fanfare,
        locator: AssetLocator::Generated("fanfare"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::Sparkle,
        locator: AssetLocator::Generated("sparkle"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Reward,
    },
    SoundSpec {
        id: SoundId::Whoosh,
        locator: AssetLocator::Generated("whoosh"),
        pool_size: DEFAULT_POOL_SIZE,
        category: SoundCategory::Feedback,
    },
    SoundSpec {
        id: SoundId::ThemeSunnyside,
        locator: AssetLocator::Path("music/theme_sunnyside.ogg"),
        pool_size: 1,
        category: SoundCategory::Music,
    },
    SoundSpec {
        id: SoundId::ThemeArcade,
        locator: AssetLocator::Path("music/theme_arcade.ogg"),
        pool_size: 1,
        category: SoundCategory::Music,
    },
];

/// Look up the catalog entry for an id.
pub fn spec_for(id: SoundId) -> &'static SoundSpec {
    // The catalog covers the closed id set; the expect can only fire if a
    // variant is added without a catalog row, which the test below catches.
    CATALOG
        .iter()
        .find(|spec| spec.id == id)
        .expect("catalog entry missing for SoundId")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_id() {
        for &id in SoundId::all() {
            let spec = spec_for(id);
            assert_eq!(spec.id, id);
            assert!(spec.pool_size >= 1);
        }
        assert_eq!(CATALOG.len(), SoundId::all().len());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = SoundId::all().iter().map(|id| id.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SoundId::all().len());
    }

    #[test]
    fn test_music_pools_are_single() {
        for &id in SoundId::all() {
            let spec = spec_for(id);
            if spec.category == SoundCategory::Music {
                assert_eq!(spec.pool_size, 1, "{id} should not pool music handles");
            }
        }
    }
}
