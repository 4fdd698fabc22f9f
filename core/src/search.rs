//! Letter-position verse search with caller-held exclusion sets

use crate::cache::WordCache;
use crate::corpus::{CorpusSelection, CorpusStore, Verse, VerseId};
use crate::error::HarfError;
use crate::letters::{matching_base_indices, Letter, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 100;

/// Raw query parameters, validated by [`SearchEngine::parse_query`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub letter: Option<String>,
    pub position: Option<String>,
    pub limit: Option<String>,
    pub exclude_ids: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub selection: CorpusSelection,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            selection: CorpusSelection::default(),
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub letter: Letter,
    pub position: Position,
    pub limit: usize,
    /// Verses the caller has already received.
    pub exclude_ids: BTreeSet<VerseId>,
}

impl SearchQuery {
    pub fn new(letter: Letter, position: Position, limit: usize) -> Self {
        Self {
            letter,
            position,
            limit,
            exclude_ids: BTreeSet::new(),
        }
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = VerseId>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }
}

/// A matching verse plus the indices of the words that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedVerse {
    pub id: VerseId,
    pub surah: u32,
    pub verse_number: u32,
    pub text: String,
    pub audio_url: String,
    pub matching_word_indices: Vec<u32>,
}

impl MatchedVerse {
    fn new(verse: &Verse, matching_word_indices: Vec<u32>) -> Self {
        Self {
            id: verse.id,
            surah: verse.surah,
            verse_number: verse.verse_number,
            text: verse.text.clone(),
            audio_url: verse.audio_url.clone(),
            matching_word_indices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub letter: Letter,
    pub position: Position,
    pub verses: Vec<MatchedVerse>,
    /// No further unseen matches exist beyond `verses`.
    pub exhausted: bool,
}

impl SearchResults {
    pub fn ids(&self) -> impl Iterator<Item = VerseId> + '_ {
        self.verses.iter().map(|v| v.id)
    }
}

pub fn parse_limit(raw: Option<&str>, settings: &SearchSettings) -> Result<usize, HarfError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(settings.default_limit);
    };
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(HarfError::InvalidQuery(format!(
            "limit must be a positive integer, got '{}'",
            raw
        ))),
        Ok(n) => Ok(n.min(settings.max_limit)),
    }
}

/// Parse a comma-separated id list. Blank segments are skipped; anything
/// else that is not an integer rejects the whole list.
pub fn parse_exclude_ids(raw: Option<&str>) -> Result<BTreeSet<VerseId>, HarfError> {
    let Some(raw) = raw else {
        return Ok(BTreeSet::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|id| {
            id.parse::<VerseId>()
                .map_err(|_| HarfError::InvalidQuery(format!("exclude_ids contains invalid id '{}'", id)))
        })
        .collect()
}

pub struct SearchEngine {
    store: Arc<dyn CorpusStore>,
    settings: SearchSettings,
    words: WordCache,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn CorpusStore>, settings: SearchSettings, cache_capacity: usize) -> Self {
        Self {
            store,
            settings,
            words: WordCache::new(cache_capacity),
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn letters(&self) -> Vec<Letter> {
        Letter::all().collect()
    }

    pub fn verse_count(&self) -> Result<u64, HarfError> {
        self.store.count(&self.settings.selection)
    }

    pub fn cache_stats(&self) -> (usize, usize) {
        self.words.stats()
    }

    pub fn parse_query(&self, params: &SearchParams) -> Result<SearchQuery, HarfError> {
        let letter: Letter = params
            .letter
            .as_deref()
            .ok_or_else(|| HarfError::InvalidQuery("letter parameter is required".to_string()))?
            .parse()?;
        let position: Position = params
            .position
            .as_deref()
            .ok_or_else(|| HarfError::InvalidQuery("position parameter is required".to_string()))?
            .parse()?;
        let limit = parse_limit(params.limit.as_deref(), &self.settings)?;
        let exclude_ids = parse_exclude_ids(params.exclude_ids.as_deref())?;

        Ok(SearchQuery {
            letter,
            position,
            limit,
            exclude_ids,
        })
    }

    /// Return up to `query.limit` matching verses not in `query.exclude_ids`,
    /// in canonical corpus order. Identical queries give identical results.
    ///
    /// The limit is clamped to the configured maximum, as in [`parse_limit`].
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, HarfError> {
        if query.limit == 0 {
            return Err(HarfError::InvalidQuery("limit must be a positive integer".to_string()));
        }
        let limit = query.limit.min(self.settings.max_limit);

        let start = Instant::now();
        let mut verses: Vec<MatchedVerse> = Vec::with_capacity(limit);
        let mut exhausted = true;

        self.store.scan(&self.settings.selection, &mut |verse: &Verse| {
            if query.exclude_ids.contains(&verse.id) {
                return ControlFlow::Continue(());
            }

            let words = self.words.get_or_compute(verse);
            let indices = matching_base_indices(&words, query.letter, query.position);
            if indices.is_empty() {
                return ControlFlow::Continue(());
            }

            // One match past the limit proves more remain
            if verses.len() == limit {
                exhausted = false;
                return ControlFlow::Break(());
            }
            verses.push(MatchedVerse::new(verse, indices));
            ControlFlow::Continue(())
        })?;

        tracing::debug!(
            letter = %query.letter,
            position = %query.position,
            limit,
            excluded = query.exclude_ids.len(),
            found = verses.len(),
            exhausted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search complete"
        );

        Ok(SearchResults {
            letter: query.letter,
            position: query.position,
            verses,
            exhausted,
        })
    }
}
