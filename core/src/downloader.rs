//! Corpus download and verification
//!
//! Fetches the full verse text once, checks that it parses as a corpus,
//! stores it in the data directory and records a manifest with its hash.

use crate::config::{Config, CorpusSource};
use crate::corpus::{parse_corpus_json, AudioSource};
use crate::error::HarfError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Uthmani script for every verse, from the public quran.com API.
pub const DEFAULT_CORPUS_URL: &str = "https://api.quran.com/api/v4/quran/verses/uthmani";

pub const MANIFEST_FILE_NAME: &str = "corpus_manifest.json";

/// Written next to the corpus file after a successful download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalManifest {
    pub source_url: String,
    pub sha256: String,
    pub verse_count: usize,
    pub downloaded_at: String,
}

pub fn manifest_path(corpus_path: &Path) -> PathBuf {
    corpus_path.with_file_name(MANIFEST_FILE_NAME)
}

/// Load local manifest from disk
pub fn load_local_manifest(corpus_path: &Path) -> Option<LocalManifest> {
    let content = fs::read_to_string(manifest_path(corpus_path)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn save_local_manifest(corpus_path: &Path, manifest: &LocalManifest) -> Result<()> {
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(manifest_path(corpus_path), content)?;
    Ok(())
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify a file's SHA256 hash. Accepts an optional `sha256:` prefix.
pub fn verify_file_hash(path: &Path, expected_hash: &str) -> Result<bool> {
    let expected = expected_hash.strip_prefix("sha256:").unwrap_or(expected_hash);

    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());

    Ok(actual == expected)
}

/// Write via a `.part` file so readers never see a half-written corpus.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = path.with_extension("json.part");
    {
        let mut file = fs::File::create(&part)
            .with_context(|| format!("Failed to create {:?}", part))?;
        file.write_all(data)?;
        file.flush()?;
    }
    fs::rename(&part, path).with_context(|| format!("Failed to move corpus into {:?}", path))?;
    Ok(())
}

/// Download the corpus from `url` into `dest` and write its manifest.
pub async fn download_corpus(url: &str, dest: &Path) -> Result<LocalManifest> {
    tracing::info!("Downloading corpus from {}", url);

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HarfError::Network(e.to_string()))
        .context("Failed to start download")?;

    if !response.status().is_success() {
        return Err(anyhow!(HarfError::Download(format!(
            "Download failed: HTTP {}",
            response.status()
        ))));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| HarfError::Network(e.to_string()))
        .context("Error reading corpus body")?;

    // Refuse to store anything we could not load later
    let verses = parse_corpus_json(&body, &AudioSource::default())?;
    if verses.is_empty() {
        return Err(anyhow!(HarfError::Download("Corpus contains no verses".to_string())));
    }

    write_atomic(dest, &body)?;

    let manifest = LocalManifest {
        source_url: url.to_string(),
        sha256: sha256_hex(&body),
        verse_count: verses.len(),
        downloaded_at: chrono::Utc::now().to_rfc3339(),
    };
    save_local_manifest(dest, &manifest)?;

    tracing::info!("Corpus downloaded: {} verses into {:?}", manifest.verse_count, dest);
    Ok(manifest)
}

/// Whether the JSON corpus at `path` is present and, if it has a manifest,
/// still matches the recorded hash.
pub fn is_local_corpus_valid(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match load_local_manifest(path) {
        Some(manifest) => match verify_file_hash(path, &manifest.sha256) {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!("Corpus at {:?} does not match its manifest hash", path);
                false
            }
            Err(e) => {
                tracing::warn!("Could not hash corpus at {:?}: {}", path, e);
                false
            }
        },
        None => true,
    }
}

/// Make sure the configured corpus is available locally, downloading the
/// JSON corpus when it is missing or damaged. Returns the manifest of a
/// fresh download, or `None` if nothing was fetched.
pub async fn ensure_corpus(config: &Config) -> Result<Option<LocalManifest>> {
    let path = match &config.corpus {
        CorpusSource::Sqlite(_) => return Ok(None),
        CorpusSource::Json(path) => path,
    };

    if is_local_corpus_valid(path) {
        tracing::info!("Corpus already present at {:?}", path);
        return Ok(None);
    }

    match &config.corpus_url {
        Some(url) => download_corpus(url, path).await.map(Some),
        None => Err(anyhow!(HarfError::CorpusNotReady(format!(
            "No corpus at {:?} and downloading is disabled",
            path
        )))),
    }
}
