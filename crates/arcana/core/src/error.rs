//! Error taxonomy shared by the store, ranker and resolvers.

use crate::{Lens, RecordKey};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The corpus could not be turned into a valid store. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus file {path}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed corpus file")]
    Parse(#[from] serde_json::Error),

    #[error("empty corpus")]
    Empty,

    #[error("lens set must contain at least one lens")]
    EmptyLensSet,

    #[error("record {index} has an empty card name")]
    EmptyEntityName { index: usize },

    #[error("record {index} ({entity}) has an empty vector")]
    EmptyVector { index: usize, entity: String },

    #[error(
        "dimension mismatch: record {index} ({entity}) has dimension {actual}, expected {expected}"
    )]
    DimensionMismatch {
        index: usize,
        entity: String,
        expected: usize,
        actual: usize,
    },

    #[error("record {index} ({entity}) has a non-finite value at position {position}")]
    NonFiniteComponent {
        index: usize,
        entity: String,
        position: usize,
    },

    #[error("record {index} ({entity}) uses lens {lens}, which this corpus is not configured for")]
    LensNotConfigured {
        index: usize,
        entity: String,
        lens: Lens,
    },

    #[error("duplicate record for {key}")]
    DuplicateRecord { key: RecordKey },

    #[error("missing record for {key}")]
    MissingRecord { key: RecordKey },
}

/// What a zero-norm vector belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringSubject {
    Query,
    Record(RecordKey),
}

impl std::fmt::Display for ScoringSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => f.write_str("query vector"),
            Self::Record(key) => write!(f, "record {key}"),
        }
    }
}

/// Failure of a single query, or of store construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("card not found: {key}")]
    NotFound { key: RecordKey },

    #[error("dimension mismatch: query has dimension {actual}, corpus has dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot score {subject}: vector has zero norm")]
    Scoring { subject: ScoringSubject },

    #[error("embedding service failed")]
    EmbeddingService(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("result count must be at least 1")]
    InvalidLimit,

    #[error("query text is empty")]
    EmptyQuery,
}

/// An unrecognised variant or lens tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTagError {
    #[error("unknown position {0:?}, expected upright or reversed")]
    Variant(String),

    #[error(
        "unknown lens {0:?}, expected one of rws_traditional, thoth_crowley, \
         jungian_psychological, modern_intuitive, combined"
    )]
    Lens(String),
}
