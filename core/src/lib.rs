//! Harf - find verses by where a letter sits in their words
//!
//! Library providing letter-position matching, corpus access and paginated search.

pub mod letters;
pub mod corpus;
pub mod cache;
pub mod search;
pub mod error;
pub mod config;
pub mod downloader;
pub mod state;

pub use error::HarfError;
pub use state::AppState;
pub use config::{Config, CorpusSource};
pub use letters::{matches, strip_diacritics, Letter, Position, ALPHABET};
pub use corpus::{AudioSource, CorpusSelection, CorpusStore, MemoryCorpus, SqliteCorpus, Verse, VerseId};
pub use cache::WordCache;
pub use search::{MatchedVerse, SearchEngine, SearchParams, SearchQuery, SearchResults, SearchSettings};
pub use downloader::{ensure_corpus, download_corpus, verify_file_hash, LocalManifest};
