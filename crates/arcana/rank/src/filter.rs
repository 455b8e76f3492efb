//! Candidate selection applied before scoring.
//!
//! Filtering happens before the top-K cut. Excluding after truncation could
//! hand back fewer than `k` results while qualifying candidates remain.

use arcana_core::{EmbeddingRecord, Lens, Variant};

/// Which records take part in a ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    /// Only records of this lens are scored.
    pub lens: Lens,
    /// Only records of this position are scored, when set.
    pub variant: Option<Variant>,
    /// Both positions of this card are dropped, when set.
    pub exclude_entity: Option<String>,
}

impl CandidateFilter {
    /// Every record of one lens.
    #[must_use]
    pub fn lens(lens: Lens) -> Self {
        Self {
            lens,
            variant: None,
            exclude_entity: None,
        }
    }

    #[must_use]
    pub fn with_variant(mut self, variant: Option<Variant>) -> Self {
        self.variant = variant;
        self
    }

    /// Drop both positions of `entity` from the pool.
    #[must_use]
    pub fn excluding_entity(mut self, entity: impl Into<String>) -> Self {
        self.exclude_entity = Some(entity.into());
        self
    }

    #[must_use]
    pub fn admits(&self, record: &EmbeddingRecord) -> bool {
        if record.lens != self.lens {
            return false;
        }
        if self.variant.is_some_and(|v| v != record.variant) {
            return false;
        }
        match &self.exclude_entity {
            Some(entity) => !record.is_entity(entity),
            None => true,
        }
    }

    /// Narrow a candidate sequence, preserving its order.
    pub fn apply<'a, I>(&'a self, records: I) -> impl Iterator<Item = &'a EmbeddingRecord> + 'a
    where
        I: IntoIterator<Item = &'a EmbeddingRecord>,
        I::IntoIter: 'a,
    {
        records.into_iter().filter(move |record| self.admits(record))
    }
}
