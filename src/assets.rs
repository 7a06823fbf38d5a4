//! Image registry and asset loading
//!
//! Decoding is the host's business. The simulation only needs to know
//! which keys exist, how large each image is and how far a bulk load got.

use std::collections::HashMap;

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One image a level needs: lookup key and source path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssetEntry {
    pub key: &'static str,
    pub path: &'static str,
}

impl AssetEntry {
    pub const fn new(key: &'static str, path: &'static str) -> Self {
        Self { key, path }
    }
}

/// A decoded image as far as the simulation cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    pub key: String,
    pub size: UVec2,
}

/// Identifies one load request. Completions carrying an older generation
/// than the level's current one are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadTicket {
    pub generation: u64,
}

/// Synchronous image lookup plus bulk loading with progress
pub trait AssetProvider {
    fn image(&self, key: &str) -> Option<&ImageHandle>;

    /// Fraction of queued images that finished, in `[0, 1]`
    fn progress(&self) -> f32;

    /// Load every entry. All entries are attempted; the first failure is
    /// returned.
    fn load_images(&mut self, entries: &[AssetEntry]) -> Result<()>;
}

/// In-memory asset registry.
///
/// Source paths resolve through a catalog of known image sizes. With a
/// fallback size set, unknown paths resolve to that size instead of
/// failing, which is what the headless runner uses.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    images: HashMap<String, ImageHandle>,
    catalog: HashMap<String, UVec2>,
    fallback_size: Option<UVec2>,
    total: usize,
    loaded: usize,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that accepts any path as an image of `size`
    pub fn with_fallback_size(size: UVec2) -> Self {
        Self {
            fallback_size: Some(size),
            ..Self::default()
        }
    }

    /// Declare the decoded size of a source path
    pub fn register(&mut self, path: impl Into<String>, size: UVec2) {
        self.catalog.insert(path.into(), size);
    }

    pub fn is_complete(&self) -> bool {
        self.loaded == self.total
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn load_one(&mut self, entry: &AssetEntry) -> Result<()> {
        let size = self
            .catalog
            .get(entry.path)
            .copied()
            .or(self.fallback_size)
            .ok_or_else(|| Error::AssetLoad {
                key: entry.key.to_string(),
                reason: format!("could not load {}", entry.path),
            })?;

        self.images.insert(
            entry.key.to_string(),
            ImageHandle {
                key: entry.key.to_string(),
                size,
            },
        );
        self.loaded += 1;
        Ok(())
    }
}

impl AssetProvider for Loader {
    fn image(&self, key: &str) -> Option<&ImageHandle> {
        self.images.get(key)
    }

    fn progress(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f32 / self.total as f32
        }
    }

    fn load_images(&mut self, entries: &[AssetEntry]) -> Result<()> {
        self.total += entries.len();
        let mut first_error = None;
        for entry in entries {
            if let Err(e) = self.load_one(entry) {
                log::error!("{e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRIES: [AssetEntry; 2] = [
        AssetEntry::new("ship", "ships/ship.png"),
        AssetEntry::new("menu", "ui/menu.png"),
    ];

    #[test]
    fn test_progress_is_one_when_nothing_queued() {
        let loader = Loader::new();
        assert_eq!(loader.progress(), 1.0);
        assert!(loader.is_complete());
    }

    #[test]
    fn test_catalog_lookup() {
        let mut loader = Loader::new();
        loader.register("ships/ship.png", UVec2::new(100, 100));
        loader.register("ui/menu.png", UVec2::new(16, 16));

        loader.load_images(&ENTRIES).unwrap();
        assert_eq!(loader.progress(), 1.0);
        assert_eq!(loader.image("menu").map(|i| i.size), Some(UVec2::new(16, 16)));
        assert!(loader.image("nope").is_none());
    }

    #[test]
    fn test_missing_path_fails_but_others_load() {
        let mut loader = Loader::new();
        loader.register("ui/menu.png", UVec2::new(16, 16));

        let err = loader.load_images(&ENTRIES).unwrap_err();
        assert!(matches!(err, Error::AssetLoad { ref key, .. } if key == "ship"));
        assert_eq!(loader.progress(), 0.5);
        assert!(!loader.is_complete());
        assert!(loader.image("menu").is_some());
    }

    #[test]
    fn test_fallback_size() {
        let mut loader = Loader::with_fallback_size(UVec2::splat(64));
        loader.load_images(&ENTRIES).unwrap();
        assert_eq!(loader.len(), 2);
        assert_eq!(loader.image("ship").unwrap().size, UVec2::splat(64));
    }
}
