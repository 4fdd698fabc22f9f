//! Verse corpus: on-disk formats, corpus selection and read-only stores

use crate::error::HarfError;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub type VerseId = u64;

/// Default audio recitation host; files are named `<verse id>.mp3`.
pub const DEFAULT_AUDIO_BASE_URL: &str = "https://cdn.islamic.network/quran/audio/128/ar.alafasy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub id: VerseId,
    pub surah: u32,
    pub verse_number: u32,
    pub text: String,
    pub audio_url: String,
}

/// A verse as stored in the downloaded corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseRecord {
    pub id: VerseId,
    pub verse_key: String,
    #[serde(alias = "text")]
    pub text_uthmani: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Accepted corpus file layouts: the remote API response or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Wrapped { verses: Vec<VerseRecord> },
    Bare(Vec<VerseRecord>),
}

impl VerseRecord {
    pub fn into_verse(self, audio: &AudioSource) -> Result<Verse, HarfError> {
        let (surah, verse_number) = parse_verse_key(&self.verse_key)?;
        let audio_url = self.audio_url.unwrap_or_else(|| audio.url_for(self.id));
        Ok(Verse {
            id: self.id,
            surah,
            verse_number,
            text: self.text_uthmani,
            audio_url,
        })
    }
}

/// Split "S:V" into surah and verse number.
pub fn parse_verse_key(key: &str) -> Result<(u32, u32), HarfError> {
    let malformed = || HarfError::CorpusNotReady(format!("Malformed verse_key '{}'", key));
    let (surah, verse) = key.split_once(':').ok_or_else(malformed)?;
    let surah: u32 = surah.trim().parse().map_err(|_| malformed())?;
    let verse: u32 = verse.trim().parse().map_err(|_| malformed())?;
    Ok((surah, verse))
}

/// Parse corpus JSON into verses, rejecting malformed keys and duplicate ids.
pub fn parse_corpus_json(data: &[u8], audio: &AudioSource) -> Result<Vec<Verse>, HarfError> {
    let file: CorpusFile = serde_json::from_slice(data)
        .map_err(|e| HarfError::CorpusNotReady(format!("Invalid corpus JSON: {}", e)))?;
    let records = match file {
        CorpusFile::Wrapped { verses } => verses,
        CorpusFile::Bare(verses) => verses,
    };

    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .map(|record| {
            if !seen.insert(record.id) {
                return Err(HarfError::CorpusNotReady(format!("Duplicate verse id {}", record.id)));
            }
            record.into_verse(audio)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub base_url: String,
}

impl AudioSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    pub fn url_for(&self, id: VerseId) -> String {
        format!("{}/{}.mp3", self.base_url.trim_end_matches('/'), id)
    }
}

impl Default for AudioSource {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIO_BASE_URL)
    }
}

/// Which part of the text is eligible for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusSelection {
    All,
    /// Inclusive surah range.
    Surahs { start: u32, end: u32 },
}

impl CorpusSelection {
    /// The final section of the text: surahs 78 through 114.
    pub const FINAL_SECTION: CorpusSelection = CorpusSelection::Surahs { start: 78, end: 114 };

    pub fn surahs(start: u32, end: u32) -> Result<Self, HarfError> {
        if start == 0 || end < start {
            return Err(HarfError::Config(format!("Invalid surah range {}-{}", start, end)));
        }
        Ok(CorpusSelection::Surahs { start, end })
    }

    pub fn contains(&self, verse: &Verse) -> bool {
        match *self {
            CorpusSelection::All => true,
            CorpusSelection::Surahs { start, end } => (start..=end).contains(&verse.surah),
        }
    }
}

impl Default for CorpusSelection {
    fn default() -> Self {
        Self::FINAL_SECTION
    }
}

impl FromStr for CorpusSelection {
    type Err = HarfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(CorpusSelection::All);
        }
        let invalid = || HarfError::Config(format!("Invalid corpus selection '{}', expected 'all' or 'START-END'", s));
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start: u32 = start.trim().parse().map_err(|_| invalid())?;
        let end: u32 = end.trim().parse().map_err(|_| invalid())?;
        CorpusSelection::surahs(start, end)
    }
}

impl fmt::Display for CorpusSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusSelection::All => f.write_str("all"),
            CorpusSelection::Surahs { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

/// Read-only access to the verses.
///
/// `scan` must visit verses in canonical (surah, verse_number) order and stop
/// as soon as the visitor breaks. Pagination relies on this order being the
/// same on every call.
pub trait CorpusStore: Send + Sync {
    fn scan(
        &self,
        selection: &CorpusSelection,
        visit: &mut dyn FnMut(&Verse) -> ControlFlow<()>,
    ) -> Result<(), HarfError>;

    fn count(&self, selection: &CorpusSelection) -> Result<u64, HarfError>;
}

/// Corpus held in memory, loaded once.
pub struct MemoryCorpus {
    verses: Vec<Verse>,
}

impl MemoryCorpus {
    pub fn new(mut verses: Vec<Verse>) -> Self {
        verses.sort_by_key(|v| (v.surah, v.verse_number, v.id));
        Self { verses }
    }

    pub fn load(path: &Path, audio: &AudioSource) -> Result<Self, HarfError> {
        let data = std::fs::read(path)
            .map_err(|e| HarfError::CorpusNotReady(format!("Failed to read {:?}: {}", path, e)))?;
        let verses = parse_corpus_json(&data, audio)?;
        tracing::info!("Loaded {} verses from {:?}", verses.len(), path);
        Ok(Self::new(verses))
    }
}

impl CorpusStore for MemoryCorpus {
    fn scan(
        &self,
        selection: &CorpusSelection,
        visit: &mut dyn FnMut(&Verse) -> ControlFlow<()>,
    ) -> Result<(), HarfError> {
        for verse in self.verses.iter().filter(|v| selection.contains(v)) {
            if visit(verse).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn count(&self, selection: &CorpusSelection) -> Result<u64, HarfError> {
        Ok(self.verses.iter().filter(|v| selection.contains(v)).count() as u64)
    }
}

/// Corpus in a SQLite database. Each call opens its own read-only connection.
pub struct SqliteCorpus {
    db_path: PathBuf,
    audio: AudioSource,
}

const VERSE_COLUMNS: &str = "id, surah, verse_number, text, audio_url";

impl SqliteCorpus {
    pub fn open(db_path: PathBuf, audio: AudioSource) -> Result<Self, HarfError> {
        let corpus = Self { db_path, audio };
        // Fail at startup rather than on the first request
        corpus.connection()?;
        Ok(corpus)
    }

    fn connection(&self) -> Result<Connection, HarfError> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| HarfError::CorpusNotReady(format!("Failed to open {:?}: {}", self.db_path, e)))
    }

    /// Create (or replace the contents of) a verse database.
    pub fn import(db_path: &Path, verses: &[Verse]) -> Result<(), HarfError> {
        let mut conn = Connection::open(db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS verses (
                id INTEGER PRIMARY KEY,
                surah INTEGER NOT NULL,
                verse_number INTEGER NOT NULL,
                text TEXT NOT NULL,
                audio_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_verses_order
            ON verses(surah, verse_number);
            "#,
        )?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM verses", [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO verses ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                VERSE_COLUMNS
            ))?;
            for verse in verses {
                stmt.execute(rusqlite::params![
                    verse.id as i64,
                    verse.surah,
                    verse.verse_number,
                    verse.text,
                    verse.audio_url,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn where_clause(selection: &CorpusSelection) -> (String, Vec<u32>) {
        match *selection {
            CorpusSelection::All => (String::new(), Vec::new()),
            CorpusSelection::Surahs { start, end } => {
                ("WHERE surah BETWEEN ?1 AND ?2".to_string(), vec![start, end])
            }
        }
    }
}

impl CorpusStore for SqliteCorpus {
    fn scan(
        &self,
        selection: &CorpusSelection,
        visit: &mut dyn FnMut(&Verse) -> ControlFlow<()>,
    ) -> Result<(), HarfError> {
        let conn = self.connection()?;
        let (filter, params) = Self::where_clause(selection);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM verses {} ORDER BY surah, verse_number, id",
            VERSE_COLUMNS, filter
        ))?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

        while let Some(row) = rows.next()? {
            let id = row.get::<_, i64>(0)? as VerseId;
            let verse = Verse {
                id,
                surah: row.get(1)?,
                verse_number: row.get(2)?,
                text: row.get(3)?,
                audio_url: row
                    .get::<_, Option<String>>(4)?
                    .unwrap_or_else(|| self.audio.url_for(id)),
            };
            if visit(&verse).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn count(&self, selection: &CorpusSelection) -> Result<u64, HarfError> {
        let conn = self.connection()?;
        let (filter, params) = Self::where_clause(selection);
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM verses {}", filter),
            rusqlite::params_from_iter(params),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
