//! Memoizing feature extractor
//!
//! Wraps any [`FeatureExtractor`] and remembers counts keyed by
//! (feature, board key, color). The table sits behind a mutex so one cache
//! can be shared by agents on different threads. It can be written to and
//! read back from a JSON file to carry results across runs.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Context;
use fourrow_core::{Action, Grid, Player};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureExtractor, PatternExtractor};
use crate::params::Feature;

type CacheKey = (Feature, String, Player);

/// One persisted cache line
#[derive(Clone, Debug, Serialize, Deserialize)]
struct CacheEntry {
    feature: Feature,
    board: String,
    color: Player,
    count: u32,
}

/// Hit/miss counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Feature extractor decorator with a shared lookup table
#[derive(Debug, Default)]
pub struct CachedExtractor<E = PatternExtractor> {
    inner: E,
    table: Mutex<FxHashMap<CacheKey, u32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E: FeatureExtractor> CachedExtractor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            table: Mutex::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<CacheKey, u32>> {
        // A panic while holding the lock cannot leave a half-written count
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the table to a JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let entries: Vec<CacheEntry> = self
            .lock()
            .iter()
            .map(|((feature, board, color), &count)| CacheEntry {
                feature: *feature,
                board: board.clone(),
                color: *color,
                count,
            })
            .collect();
        let content = serde_json::to_string(&entries)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write feature cache: {}", path.display()))?;
        Ok(())
    }

    /// Merge entries from a JSON file written by [`CachedExtractor::save`]
    pub fn load(&self, path: &Path) -> anyhow::Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature cache: {}", path.display()))?;
        let entries: Vec<CacheEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse feature cache: {}", path.display()))?;

        let loaded = entries.len();
        let mut table = self.lock();
        for entry in entries {
            table.insert((entry.feature, entry.board, entry.color), entry.count);
        }
        tracing::debug!("Loaded {} cached feature counts from {}", loaded, path.display());
        Ok(loaded)
    }
}

impl<E: FeatureExtractor> FeatureExtractor for CachedExtractor<E> {
    fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32 {
        let color = match pieces.first().and_then(|&a| grid.at(a).owner()) {
            Some(color) if pieces.len() >= feature.min_pieces() => color,
            _ => return self.inner.count(feature, grid, pieces),
        };

        let key = (feature, grid.to_key(), color);
        if let Some(&count) = self.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return count;
        }

        let count = self.inner.count(feature, grid, pieces);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(key, count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as Counter;

    /// Counts how often the wrapped extractor actually runs
    #[derive(Default)]
    struct Probe {
        calls: Counter<u32>,
    }

    impl FeatureExtractor for Probe {
        fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32 {
            self.calls.set(self.calls.get() + 1);
            PatternExtractor.count(feature, grid, pieces)
        }
    }

    fn board() -> Grid {
        Grid::from_key("0 0 0 0 . . . . .-1 1 1 . . . . . .-. . . . . . . . .-. . . . . . . . .")
            .unwrap()
    }

    #[test]
    fn test_cache_hits_on_repeat() {
        let cache = CachedExtractor::new(Probe::default());
        let g = board();
        let black = g.pieces(Player::Black);

        assert_eq!(cache.count(Feature::Connected4, &g, &black), 1);
        assert_eq!(cache.count(Feature::Connected4, &g, &black), 1);
        assert_eq!(cache.inner.calls.get(), 1);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_cache_keys_by_color() {
        let cache = CachedExtractor::new(PatternExtractor);
        let g = board();

        assert_eq!(cache.count(Feature::Connected3, &g, &g.pieces(Player::White)), 1);
        assert_eq!(cache.count(Feature::Connected4, &g, &g.pieces(Player::Black)), 1);
        assert_eq!(cache.count(Feature::Connected4, &g, &g.pieces(Player::White)), 0);
        assert_eq!(cache.stats().entries, 3);
    }

    #[test]
    fn test_small_piece_sets_bypass_table() {
        let cache = CachedExtractor::new(PatternExtractor);
        let g = Grid::default();
        assert_eq!(cache.count(Feature::Connected2, &g, &[]), 0);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("fourrow-cache-{}.json", std::process::id()));
        let g = board();

        let cache = CachedExtractor::new(PatternExtractor);
        cache.count(Feature::Connected2, &g, &g.pieces(Player::Black));
        cache.count(Feature::Connected3, &g, &g.pieces(Player::White));
        cache.save(&path).unwrap();

        let restored = CachedExtractor::new(Probe::default());
        assert_eq!(restored.load(&path).unwrap(), 2);
        restored.count(Feature::Connected3, &g, &g.pieces(Player::White));
        assert_eq!(restored.inner.calls.get(), 0);

        let _ = std::fs::remove_file(path);
    }
}
