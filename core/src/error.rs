//! Error types for Harf

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarfError {
    /// Bad letter, position, limit or exclusion list. Raised before the
    /// corpus is touched.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The corpus store could not be read. Never collapsed into an empty result.
    #[error("Corpus not ready: {0}")]
    CorpusNotReady(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl HarfError {
    pub fn is_validation(&self) -> bool {
        matches!(self, HarfError::InvalidQuery(_))
    }

    /// True for failures of the corpus store rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, HarfError::CorpusNotReady(_) | HarfError::Database(_))
    }
}

impl From<rusqlite::Error> for HarfError {
    fn from(e: rusqlite::Error) -> Self {
        HarfError::Database(e.to_string())
    }
}

impl serde::Serialize for HarfError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(HarfError::InvalidQuery("x".into()).is_validation());
        assert!(!HarfError::InvalidQuery("x".into()).is_infrastructure());
        assert!(HarfError::CorpusNotReady("x".into()).is_infrastructure());
        assert!(HarfError::Database("x".into()).is_infrastructure());
        assert!(!HarfError::Other("x".into()).is_validation());
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&HarfError::InvalidQuery("limit must be positive".into())).unwrap();
        assert_eq!(json, "\"Invalid query: limit must be positive\"");
    }
}
