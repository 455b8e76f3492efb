//! Query resolvers.
//!
//! Two ways in, one way through the ranker:
//! - [`Searcher::search_text`] asks an [`Embedder`] for a query vector.
//! - [`Searcher::find_similar`] takes the vector of a stored card. By default
//!   both positions of that card are left out of the results, since a card's
//!   own other position is nearly always its closest neighbour and says
//!   nothing new.

use std::sync::Arc;

use arcana_core::{Error, Lens, SearchResult, Variant};
use arcana_inference::{EmbedError, Embedder};
use arcana_rank::{CandidateFilter, Scored};
use arcana_store::{Catalog, EmbeddingStore};

/// Result count when the caller does not choose one.
pub const DEFAULT_LIMIT: usize = 1;

/// Options for a free-text search.
#[derive(Debug, Clone)]
pub struct TextQuery {
    /// Lens to search under. The corpus default when unset.
    pub lens: Option<Lens>,
    /// Restrict matches to one position.
    pub variant: Option<Variant>,
    pub limit: usize,
}

impl Default for TextQuery {
    fn default() -> Self {
        Self {
            lens: None,
            variant: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Options for a similar-card lookup.
#[derive(Debug, Clone)]
pub struct SimilarQuery {
    /// Position of the card whose vector is the query.
    pub variant: Variant,
    /// Lens to search under. The corpus default when unset.
    pub lens: Option<Lens>,
    /// Keep the query card's own records in the candidate pool.
    pub include_same_card: bool,
    pub limit: usize,
}

impl Default for SimilarQuery {
    fn default() -> Self {
        Self {
            variant: Variant::Primary,
            lens: None,
            include_same_card: false,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Runs queries against a shared, read-only store.
#[derive(Debug, Clone)]
pub struct Searcher {
    store: Arc<EmbeddingStore>,
    catalog: Option<Arc<Catalog>>,
}

impl Searcher {
    #[must_use]
    pub fn new(store: Arc<EmbeddingStore>) -> Self {
        Self {
            store,
            catalog: None,
        }
    }

    /// Use catalog meanings as display text instead of the embedded source text.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Rank the corpus against the embedding of `text`.
    pub fn search_text<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        text: &str,
        query: &TextQuery,
    ) -> arcana_core::Result<Vec<SearchResult>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyQuery);
        }
        if query.limit == 0 {
            return Err(Error::InvalidLimit);
        }

        let lens = query.lens.unwrap_or_else(|| self.store.default_lens());
        tracing::debug!(query = %text, %lens, variant = ?query.variant, k = query.limit, "text search");

        let vector = embedder
            .embed(text)
            .map_err(|e| Error::EmbeddingService(Box::new(e)))?;

        let dimension = self.store.dimension();
        if vector.len() != dimension {
            return Err(Error::EmbeddingService(Box::new(
                EmbedError::UnexpectedDimension {
                    expected: dimension,
                    actual: vector.len(),
                },
            )));
        }

        let filter = CandidateFilter::lens(lens).with_variant(query.variant);
        let ranked = arcana_rank::rank(
            &vector,
            filter.apply(self.store.all(lens)),
            dimension,
            query.limit,
        )?;

        Ok(self.to_results(ranked))
    }

    /// Rank the corpus against a stored card.
    ///
    /// `entity` must be the exact stored name.
    pub fn find_similar(
        &self,
        entity: &str,
        query: &SimilarQuery,
    ) -> arcana_core::Result<Vec<SearchResult>> {
        let lens = query.lens.unwrap_or_else(|| self.store.default_lens());
        tracing::debug!(
            %entity,
            variant = %query.variant,
            %lens,
            include_same_card = query.include_same_card,
            k = query.limit,
            "similar-card search"
        );

        let target = self.store.get(entity, query.variant, lens)?;

        let mut filter = CandidateFilter::lens(lens);
        if !query.include_same_card {
            filter = filter.excluding_entity(entity);
        }

        let ranked = arcana_rank::rank(
            &target.vector,
            filter.apply(self.store.all(lens)),
            self.store.dimension(),
            query.limit,
        )?;

        Ok(self.to_results(ranked))
    }

    fn to_results(&self, ranked: Vec<Scored<'_>>) -> Vec<SearchResult> {
        ranked
            .into_iter()
            .map(|Scored { record, score }| SearchResult {
                entity: record.entity.clone(),
                variant: record.variant,
                lens: record.lens,
                score,
                text: self.display_text(record),
            })
            .collect()
    }

    fn display_text(&self, record: &arcana_core::EmbeddingRecord) -> String {
        self.catalog
            .as_deref()
            .and_then(|catalog| catalog.meaning(&record.entity, record.variant, record.lens))
            .unwrap_or(&record.text)
            .to_string()
    }
}
