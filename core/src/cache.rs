//! Per-verse cache of diacritic-stripped words, with LRU eviction

use crate::corpus::{Verse, VerseId};
use crate::letters::base_letters;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CACHE_CAPACITY: usize = 8192;

/// Base letters of each whitespace-separated word of a verse, in order.
pub type VerseWords = Vec<Vec<char>>;

pub struct WordCache {
    cache: Mutex<LruCache<VerseId, Arc<VerseWords>>>,
}

impl WordCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self { cache: Mutex::new(LruCache::new(capacity)) }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<VerseId, Arc<VerseWords>>> {
        // The cache holds derived data only, so a poisoned lock is still usable
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stripped words for `verse`, computing and caching them on a miss.
    pub fn get_or_compute(&self, verse: &Verse) -> Arc<VerseWords> {
        if let Some(words) = self.lock().get(&verse.id) {
            return Arc::clone(words);
        }

        let words: Arc<VerseWords> = Arc::new(verse.text.split_whitespace().map(base_letters).collect());
        self.lock().put(verse.id, Arc::clone(&words));
        words
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// (entries, capacity)
    pub fn stats(&self) -> (usize, usize) {
        let cache = self.lock();
        (cache.len(), cache.cap().get())
    }
}

impl Default for WordCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
