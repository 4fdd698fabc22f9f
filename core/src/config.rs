//! Service configuration read from `HARF_*` environment variables
//!
//!   HARF_BIND_ADDR       listen address (default: 127.0.0.1:5000)
//!   HARF_DATA_DIR        directory for the downloaded corpus (default: <platform data dir>/harf)
//!   HARF_CORPUS_DB       SQLite corpus; when set, used instead of the JSON corpus
//!   HARF_CORPUS_URL      where to fetch the JSON corpus from; empty disables fetching
//!   HARF_SURAHS          searchable selection, "all" or "START-END" (default: 78-114)
//!   HARF_AUDIO_BASE_URL  recitation audio host
//!   HARF_DEFAULT_LIMIT   results per page when the caller gives none (default: 5)
//!   HARF_MAX_LIMIT       upper bound on results per page (default: 100)
//!   HARF_CACHE_CAPACITY  verses kept in the word cache (default: 8192)

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::corpus::{AudioSource, CorpusSelection, DEFAULT_AUDIO_BASE_URL};
use crate::downloader::DEFAULT_CORPUS_URL;
use crate::error::HarfError;
use crate::search::{SearchSettings, DEFAULT_LIMIT, MAX_LIMIT};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const CORPUS_FILE_NAME: &str = "quran_data.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    Json(PathBuf),
    Sqlite(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub corpus: CorpusSource,
    pub corpus_url: Option<String>,
    pub audio: AudioSource,
    pub search: SearchSettings,
    pub cache_capacity: usize,
}

/// Platform data directory for Harf, or `./data` when there is none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("harf"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, HarfError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| HarfError::Config(format!("{} has invalid value '{}'", key, v))),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, HarfError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarfError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("HARF_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let data_dir = lookup("HARF_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let corpus = match lookup("HARF_CORPUS_DB") {
            Some(db) if !db.trim().is_empty() => CorpusSource::Sqlite(PathBuf::from(db)),
            _ => CorpusSource::Json(data_dir.join(CORPUS_FILE_NAME)),
        };

        let corpus_url = match lookup("HARF_CORPUS_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_CORPUS_URL.to_string()),
        };

        let audio = AudioSource::new(
            lookup("HARF_AUDIO_BASE_URL").unwrap_or_else(|| DEFAULT_AUDIO_BASE_URL.to_string()),
        );

        let selection = parse_var("HARF_SURAHS", lookup("HARF_SURAHS"), CorpusSelection::default())?;
        let default_limit = parse_var("HARF_DEFAULT_LIMIT", lookup("HARF_DEFAULT_LIMIT"), DEFAULT_LIMIT)?;
        let max_limit = parse_var("HARF_MAX_LIMIT", lookup("HARF_MAX_LIMIT"), MAX_LIMIT)?;
        if default_limit == 0 || max_limit == 0 {
            return Err(HarfError::Config("result limits must be positive".to_string()));
        }
        if default_limit > max_limit {
            return Err(HarfError::Config(format!(
                "HARF_DEFAULT_LIMIT ({}) exceeds HARF_MAX_LIMIT ({})",
                default_limit, max_limit
            )));
        }

        let cache_capacity = parse_var(
            "HARF_CACHE_CAPACITY",
            lookup("HARF_CACHE_CAPACITY"),
            DEFAULT_CACHE_CAPACITY,
        )?;

        Ok(Self {
            bind_addr,
            data_dir,
            corpus,
            corpus_url,
            audio,
            search: SearchSettings {
                selection,
                default_limit,
                max_limit,
            },
            cache_capacity,
        })
    }
}
