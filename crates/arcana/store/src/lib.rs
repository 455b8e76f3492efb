//! Immutable in-memory embedding store.
//!
//! The corpus is a JSON array written by the embedding generation job. It is
//! loaded and validated once; afterwards the store is read-only and can be
//! shared across threads behind an `Arc`.
//!
//! Validation rejects the whole corpus on the first problem:
//! - empty corpus, empty card name, empty or non-finite vector
//! - a vector whose length differs from the corpus dimension
//! - a lens the corpus is not configured for
//! - a duplicate (card, position, lens) key, or a missing one

mod catalog;
mod corpus;

use arcana_core::{CorpusError, EmbeddingRecord, Lens, LensSet, RecordKey, Variant};

pub use catalog::{Catalog, CatalogError};
pub use corpus::CorpusEntry;

/// Options fixed when the corpus is loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Lenses the corpus must cover. Inferred from the records when unset.
    pub lenses: Option<LensSet>,
    /// Expected vector dimension. The first record decides when unset.
    pub dimension: Option<usize>,
}

/// All embedding records for the lifetime of the process.
#[derive(Debug)]
pub struct EmbeddingStore {
    records: Vec<EmbeddingRecord>,
    index: std::collections::HashMap<RecordKey, usize>,
    by_lens: std::collections::BTreeMap<Lens, Vec<usize>>,
    entities: Vec<String>,
    lenses: LensSet,
    dimension: usize,
}

impl EmbeddingStore {
    /// Load and validate a corpus file.
    pub fn load(path: &std::path::Path, options: &LoadOptions) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<CorpusEntry> = serde_json::from_str(&content)?;

        let store = Self::from_records(entries.into_iter().map(CorpusEntry::into_record), options)?;

        tracing::info!(
            path = %path.display(),
            records = store.len(),
            cards = store.entities.len(),
            dimension = store.dimension,
            lenses = ?store.lenses,
            "loaded corpus"
        );

        Ok(store)
    }

    /// Validate records that are already in memory.
    pub fn from_records(
        records: impl IntoIterator<Item = EmbeddingRecord>,
        options: &LoadOptions,
    ) -> Result<Self, CorpusError> {
        let records: Vec<EmbeddingRecord> = records.into_iter().collect();

        let Some(first) = records.first() else {
            return Err(CorpusError::Empty);
        };

        let lenses = match &options.lenses {
            Some(lenses) => lenses.clone(),
            None => LensSet::new(records.iter().map(|r| r.lens))?,
        };
        let dimension = options.dimension.unwrap_or(first.vector.len());

        let mut index = std::collections::HashMap::with_capacity(records.len());
        let mut by_lens: std::collections::BTreeMap<Lens, Vec<usize>> =
            std::collections::BTreeMap::new();
        let mut entities = Vec::new();
        let mut seen_entities = std::collections::HashSet::new();

        for (i, record) in records.iter().enumerate() {
            validate_record(i, record, &lenses, dimension)?;

            if index.insert(record.key(), i).is_some() {
                return Err(CorpusError::DuplicateRecord { key: record.key() });
            }
            by_lens.entry(record.lens).or_default().push(i);

            if seen_entities.insert(record.entity.as_str()) {
                entities.push(record.entity.clone());
            }
        }

        // Every card needs both positions under every configured lens.
        for entity in &entities {
            for lens in lenses.iter() {
                for variant in Variant::ALL {
                    let key = RecordKey::new(entity.as_str(), variant, lens);
                    if !index.contains_key(&key) {
                        return Err(CorpusError::MissingRecord { key });
                    }
                }
            }
        }

        Ok(Self {
            records,
            index,
            by_lens,
            entities,
            lenses,
            dimension,
        })
    }

    /// Exact, case-sensitive lookup.
    pub fn get(
        &self,
        entity: &str,
        variant: Variant,
        lens: Lens,
    ) -> arcana_core::Result<&EmbeddingRecord> {
        let key = RecordKey::new(entity, variant, lens);
        match self.index.get(&key) {
            Some(&i) => Ok(&self.records[i]),
            None => Err(arcana_core::Error::NotFound { key }),
        }
    }

    /// Records of one lens, in corpus file order.
    pub fn all(&self, lens: Lens) -> impl Iterator<Item = &EmbeddingRecord> + '_ {
        self.by_lens
            .get(&lens)
            .into_iter()
            .flatten()
            .map(|&i| &self.records[i])
    }

    /// Map a user's spelling of a card name to the stored name.
    ///
    /// Exact matches win; otherwise the first case-insensitive match.
    #[must_use]
    pub fn resolve_entity_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if let Some(exact) = self.entities.iter().find(|e| *e == name) {
            return Some(exact);
        }
        let lowered = name.to_lowercase();
        self.entities
            .iter()
            .find(|e| e.to_lowercase() == lowered)
            .map(String::as_str)
    }

    /// Card names in order of first appearance.
    #[must_use]
    pub fn entity_names(&self) -> &[String] {
        &self.entities
    }

    #[must_use]
    pub fn lenses(&self) -> &LensSet {
        &self.lenses
    }

    #[must_use]
    pub fn default_lens(&self) -> Lens {
        self.lenses.default_lens()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: an empty corpus never loads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn validate_record(
    index: usize,
    record: &EmbeddingRecord,
    lenses: &LensSet,
    dimension: usize,
) -> Result<(), CorpusError> {
    if record.entity.trim().is_empty() {
        return Err(CorpusError::EmptyEntityName { index });
    }

    if !lenses.contains(record.lens) {
        return Err(CorpusError::LensNotConfigured {
            index,
            entity: record.entity.clone(),
            lens: record.lens,
        });
    }

    if record.vector.is_empty() {
        return Err(CorpusError::EmptyVector {
            index,
            entity: record.entity.clone(),
        });
    }

    if record.vector.len() != dimension {
        return Err(CorpusError::DimensionMismatch {
            index,
            entity: record.entity.clone(),
            expected: dimension,
            actual: record.vector.len(),
        });
    }

    if let Some(position) = record.vector.iter().position(|v| !v.is_finite()) {
        return Err(CorpusError::NonFiniteComponent {
            index,
            entity: record.entity.clone(),
            position,
        });
    }

    Ok(())
}
