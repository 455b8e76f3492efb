//! On-disk shape of the corpus file.

use arcana_core::{EmbeddingRecord, Lens, Variant};

/// One element of the corpus JSON array.
///
/// Corpora built for a single lens omit `interpretation_system`; those records
/// belong to the `combined` lens.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CorpusEntry {
    pub card_name: String,
    pub position: Variant,
    #[serde(default = "combined")]
    pub interpretation_system: Lens,
    pub text: String,
    pub embedding: Vec<f32>,
}

fn combined() -> Lens {
    Lens::Combined
}

impl CorpusEntry {
    #[must_use]
    pub fn into_record(self) -> EmbeddingRecord {
        EmbeddingRecord {
            entity: self.card_name,
            variant: self.position,
            lens: self.interpretation_system,
            text: self.text,
            vector: self.embedding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_lens_means_combined() {
        let entry: CorpusEntry = serde_json::from_str(
            r#"{"card_name": "The Fool", "position": "reversed", "text": "t", "embedding": [0.5]}"#,
        )
        .unwrap();
        let record = entry.into_record();
        assert_eq!(record.lens, Lens::Combined);
        assert_eq!(record.variant, Variant::Inverted);
    }

    #[test]
    fn test_explicit_lens() {
        let entry: CorpusEntry = serde_json::from_str(
            r#"{"card_name": "The Fool", "position": "upright",
                "interpretation_system": "thoth_crowley", "text": "t", "embedding": [0.5]}"#,
        )
        .unwrap();
        assert_eq!(entry.interpretation_system, Lens::ThothCrowley);
    }

    #[test]
    fn test_unknown_lens_is_a_shape_error() {
        let result: Result<CorpusEntry, _> = serde_json::from_str(
            r#"{"card_name": "The Fool", "position": "upright",
                "interpretation_system": "marseille", "text": "t", "embedding": [0.5]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_embedding_is_a_shape_error() {
        let result: Result<CorpusEntry, _> =
            serde_json::from_str(r#"{"card_name": "The Fool", "position": "upright", "text": "t"}"#);
        assert!(result.is_err());
    }
}
