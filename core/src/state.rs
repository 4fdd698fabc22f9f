//! Application state management

use crate::config::{Config, CorpusSource};
use crate::corpus::{CorpusStore, MemoryCorpus, SqliteCorpus};
use crate::search::{SearchEngine, SearchSettings};
use anyhow::Result;
use std::sync::Arc;

/// Application state holding the search engine
pub struct AppState {
    pub search_engine: Arc<SearchEngine>,
}

impl AppState {
    /// Open the configured corpus and build the search engine
    pub fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn CorpusStore> = match &config.corpus {
            CorpusSource::Json(path) => Arc::new(MemoryCorpus::load(path, &config.audio)?),
            CorpusSource::Sqlite(path) => Arc::new(SqliteCorpus::open(path.clone(), config.audio.clone())?),
        };
        tracing::info!(
            "Corpus selection {} ({:?})",
            config.search.selection,
            config.corpus
        );
        Ok(Self::from_store(store, config.search.clone(), config.cache_capacity))
    }

    pub fn from_store(store: Arc<dyn CorpusStore>, settings: SearchSettings, cache_capacity: usize) -> Self {
        Self {
            search_engine: Arc::new(SearchEngine::new(store, settings, cache_capacity)),
        }
    }
}
