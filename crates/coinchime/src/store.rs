//! Asset store interface
//!
//! The engine treats asset storage as an external collaborator: something
//! that can answer "does this asset exist" and "give me its bytes". The
//! existence probe runs before any fetch so a missing asset is discovered
//! cheaply and the sound silently stays unregistered (playback then falls
//! back to synthesis).

use std::path::{Path, PathBuf};

use crate::error::AudioError;
use crate::registry::AssetLocator;

/// Read-only access to the asset store backing the sound catalog.
pub trait AssetStore {
    /// Cheap existence check for a locator. Must not fetch the asset body.
    fn probe(&self, locator: &AssetLocator) -> bool;

    /// Fetch the asset bytes for a locator.
    ///
    /// # Errors
    /// `Store` if the asset cannot be read.
    fn read(&self, locator: &AssetLocator) -> Result<Vec<u8>, AudioError>;
}

/// Directory under the store root holding pipeline-generated assets.
const GENERATED_DIR: &str = "generated";

/// Filesystem-backed asset store rooted at a directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Create a store over `root`. The directory does not need to exist;
    /// probes against a missing root simply answer `false`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a locator to a concrete path under the root.
    ///
    /// Generated references land in the store's generated-asset area as WAV
    /// files, the format the content pipeline publishes.
    pub fn resolve(&self, locator: &AssetLocator) -> PathBuf {
        match locator {
            AssetLocator::Path(rel) => self.root.join(rel),
            AssetLocator::Generated(name) => self
                .root
                .join(GENERATED_DIR)
                .join(format!("{name}.wav")),
        }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirStore {
    fn probe(&self, locator: &AssetLocator) -> bool {
        self.resolve(locator).is_file()
    }

    fn read(&self, locator: &AssetLocator) -> Result<Vec<u8>, AudioError> {
        Ok(std::fs::read(self.resolve(locator))?)
    }
}

/// In-memory asset store keyed by resolved locator name.
///
/// Used by the test suite and by headless hosts that bundle assets into the
/// binary instead of shipping a directory tree.
#[derive(Default)]
pub struct MemStore {
    entries: std::collections::HashMap<String, Vec<u8>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert asset bytes for a locator.
    pub fn insert(&mut self, locator: &AssetLocator, bytes: Vec<u8>) {
        self.entries.insert(Self::key(locator), bytes);
    }

    fn key(locator: &AssetLocator) -> String {
        match locator {
            AssetLocator::Path(rel) => (*rel).to_string(),
            AssetLocator::Generated(name) => format!("{GENERATED_DIR}/{name}.wav"),
        }
    }
}

impl AssetStore for MemStore {
    fn probe(&self, locator: &AssetLocator) -> bool {
        self.entries.contains_key(&Self::key(locator))
    }

    fn read(&self, locator: &AssetLocator) -> Result<Vec<u8>, AudioError> {
        self.entries.get(&Self::key(locator)).cloned().ok_or_else(|| {
            AudioError::Store(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "asset not present in memory store",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_store_resolution() {
        let store = DirStore::new("/assets");
        assert_eq!(
            store.resolve(&AssetLocator::Path("sfx/tap.ogg")),
            PathBuf::from("/assets/sfx/tap.ogg")
        );
        assert_eq!(
            store.resolve(&AssetLocator::Generated("fanfare")),
            PathBuf::from("/assets/generated/fanfare.wav")
        );
    }

    #[test]
    fn test_probe_missing_root_is_false() {
        let store = DirStore::new("/definitely/not/a/real/dir");
        assert!(!store.probe(&AssetLocator::Path("sfx/tap.ogg")));
    }

    #[test]
    fn test_mem_store_roundtrip() {
        let mut store = MemStore::new();
        let locator = AssetLocator::Generated("sparkle");
        assert!(!store.probe(&locator));

        store.insert(&locator, vec![1, 2, 3]);
        assert!(store.probe(&locator));
        assert_eq!(store.read(&locator).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mem_store_read_missing() {
        let store = MemStore::new();
        let result = store.read(&AssetLocator::Path("nope.ogg"));
        assert!(matches!(result, Err(AudioError::Store(_))));
    }
}
