//! Core types and traits for arcana.
//!
//! A corpus is a set of [`EmbeddingRecord`]s keyed by (card name, [`Variant`],
//! [`Lens`]). Every crate in the workspace speaks in these types.

mod error;

pub use error::{CorpusError, Error, ParseTagError, Result, ScoringSubject};

/// One of the two orientations every card carries.
///
/// The corpus file spells them `upright` / `reversed`; `primary` / `inverted`
/// are accepted as aliases.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Variant {
    #[default]
    #[serde(rename = "upright", alias = "primary")]
    Primary,
    #[serde(rename = "reversed", alias = "inverted")]
    Inverted,
}

impl Variant {
    /// Both variants, primary first.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Inverted];

    /// The tag used in corpus files and structured output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "upright",
            Self::Inverted => "reversed",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = ParseTagError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "upright" | "primary" => Ok(Self::Primary),
            "reversed" | "inverted" => Ok(Self::Inverted),
            other => Err(ParseTagError::Variant(other.to_string())),
        }
    }
}

/// An interpretive system under which card text was written before embedding.
///
/// `Combined` aggregates the four traditions. Declaration order is the order
/// lenses are listed and iterated in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Lens {
    RwsTraditional,
    ThothCrowley,
    JungianPsychological,
    ModernIntuitive,
    Combined,
}

impl Lens {
    /// Every lens the corpus format knows about.
    pub const ALL: [Self; 5] = [
        Self::RwsTraditional,
        Self::ThothCrowley,
        Self::JungianPsychological,
        Self::ModernIntuitive,
        Self::Combined,
    ];

    /// The tag used in corpus files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RwsTraditional => "rws_traditional",
            Self::ThothCrowley => "thoth_crowley",
            Self::JungianPsychological => "jungian_psychological",
            Self::ModernIntuitive => "modern_intuitive",
            Self::Combined => "combined",
        }
    }

    /// Human-readable name for narrative output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RwsTraditional => "Rider-Waite-Smith traditional",
            Self::ThothCrowley => "Crowley/Thoth",
            Self::JungianPsychological => "Jungian/psychological",
            Self::ModernIntuitive => "Modern/intuitive",
            Self::Combined => "Combined",
        }
    }
}

impl std::fmt::Display for Lens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Lens {
    type Err = ParseTagError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lens| lens.as_str() == s)
            .ok_or_else(|| ParseTagError::Lens(s.to_string()))
    }
}

/// The lenses a corpus was built with. Never empty.
///
/// A single-lens deployment is the one-element set, usually `{combined}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensSet {
    lenses: Vec<Lens>,
}

impl LensSet {
    /// Build a set from any sequence of lenses. Duplicates collapse.
    pub fn new(lenses: impl IntoIterator<Item = Lens>) -> Result<Self, CorpusError> {
        let mut lenses: Vec<Lens> = lenses.into_iter().collect();
        lenses.sort_unstable();
        lenses.dedup();
        if lenses.is_empty() {
            return Err(CorpusError::EmptyLensSet);
        }
        Ok(Self { lenses })
    }

    /// The one-lens deployment: every record is `combined`.
    #[must_use]
    pub fn single(lens: Lens) -> Self {
        Self {
            lenses: vec![lens],
        }
    }

    /// All five lenses.
    #[must_use]
    pub fn full() -> Self {
        Self {
            lenses: Lens::ALL.to_vec(),
        }
    }

    #[must_use]
    pub fn contains(&self, lens: Lens) -> bool {
        self.lenses.binary_search(&lens).is_ok()
    }

    /// The lens used when a query does not name one: `combined` when the
    /// corpus has it, otherwise the first configured lens.
    #[must_use]
    pub fn default_lens(&self) -> Lens {
        if self.contains(Lens::Combined) {
            Lens::Combined
        } else {
            self.lenses[0]
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Lens> + '_ {
        self.lenses.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lenses.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lenses.is_empty()
    }
}

/// Composite key of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub entity: String,
    pub variant: Variant,
    pub lens: Lens,
}

impl RecordKey {
    pub fn new(entity: impl Into<String>, variant: Variant, lens: Lens) -> Self {
        Self {
            entity: entity.into(),
            variant,
            lens,
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.entity, self.variant, self.lens)
    }
}

/// The atomic stored unit: one vector for one card orientation under one lens.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// Card name, unique within the corpus.
    pub entity: String,
    pub variant: Variant,
    pub lens: Lens,
    /// Text the vector was generated from. Provenance only, never scored.
    pub text: String,
    /// The embedding. Length is the corpus dimension.
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.entity.clone(), self.variant, self.lens)
    }

    /// Whether this record belongs to the given card, in either orientation.
    #[must_use]
    pub fn is_entity(&self, entity: &str) -> bool {
        self.entity == entity
    }
}

/// A ranked match produced by one query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matched card.
    pub entity: String,
    pub variant: Variant,
    /// Lens of the record the score was computed against.
    pub lens: Lens,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// Meaning shown to the user.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_tags() {
        assert_eq!("upright".parse::<Variant>().unwrap(), Variant::Primary);
        assert_eq!("inverted".parse::<Variant>().unwrap(), Variant::Inverted);
        assert!("sideways".parse::<Variant>().is_err());
    }

    #[test]
    fn test_variant_serde_aliases() {
        let v: Variant = serde_json::from_str("\"primary\"").unwrap();
        assert_eq!(v, Variant::Primary);
        assert_eq!(serde_json::to_string(&Variant::Inverted).unwrap(), "\"reversed\"");
    }

    #[test]
    fn test_lens_roundtrip_tags() {
        for lens in Lens::ALL {
            assert_eq!(lens.as_str().parse::<Lens>().unwrap(), lens);
            let json = serde_json::to_string(&lens).unwrap();
            assert_eq!(json, format!("\"{}\"", lens.as_str()));
        }
        assert!("tarot_de_marseille".parse::<Lens>().is_err());
    }

    #[test]
    fn test_lens_set_default() {
        assert_eq!(LensSet::full().default_lens(), Lens::Combined);
        assert_eq!(
            LensSet::single(Lens::ThothCrowley).default_lens(),
            Lens::ThothCrowley
        );

        let set = LensSet::new([Lens::ModernIntuitive, Lens::RwsTraditional]).unwrap();
        assert_eq!(set.default_lens(), Lens::RwsTraditional);
    }

    #[test]
    fn test_lens_set_rejects_empty() {
        assert!(matches!(
            LensSet::new(std::iter::empty()),
            Err(CorpusError::EmptyLensSet)
        ));
    }

    #[test]
    fn test_lens_set_dedups() {
        let set = LensSet::new([Lens::Combined, Lens::Combined, Lens::ThothCrowley]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Lens::ThothCrowley));
        assert!(!set.contains(Lens::RwsTraditional));
    }

    #[test]
    fn test_record_key_display() {
        let key = RecordKey::new("The Fool", Variant::Inverted, Lens::Combined);
        assert_eq!(key.to_string(), "The Fool (reversed, combined)");
    }
}
