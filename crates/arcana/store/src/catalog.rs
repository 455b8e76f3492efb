//! Card meanings shown next to search results.
//!
//! `cards.json` carries the basic upright (`desc`) and reversed (`rdesc`)
//! meaning of every card. `interpretations.json` optionally adds one meaning
//! per lens and position. Other fields (card art and so on) are ignored.

use arcana_core::{Lens, Variant};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {path}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed card data in {what}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, serde::Deserialize)]
struct CardEntry {
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    rdesc: String,
}

/// Meanings for one lens, keyed by `upright` / `reversed`.
type LensMeanings = std::collections::HashMap<String, String>;

/// Basic and per-lens meanings of every card.
#[derive(Debug, Default)]
pub struct Catalog {
    basic: std::collections::HashMap<String, [String; 2]>,
    by_lens: std::collections::HashMap<String, std::collections::HashMap<Lens, [String; 2]>>,
}

impl Catalog {
    /// Load `cards.json` and, when given, `interpretations.json`.
    pub fn load(
        cards_path: &std::path::Path,
        interpretations_path: Option<&std::path::Path>,
    ) -> Result<Self, CatalogError> {
        let cards = read(cards_path)?;
        let interpretations = interpretations_path.map(read).transpose()?;
        let catalog = Self::from_json(&cards, interpretations.as_deref())?;

        tracing::info!(
            cards = catalog.basic.len(),
            interpreted = catalog.by_lens.len(),
            "loaded card catalog"
        );

        Ok(catalog)
    }

    /// Parse catalog JSON that is already in memory.
    pub fn from_json(cards: &str, interpretations: Option<&str>) -> Result<Self, CatalogError> {
        let entries: Vec<CardEntry> =
            serde_json::from_str(cards).map_err(|source| CatalogError::Parse {
                what: "cards".to_string(),
                source,
            })?;

        let basic = entries
            .into_iter()
            .map(|card| (card.name, [card.desc, card.rdesc]))
            .collect();

        let mut by_lens = std::collections::HashMap::new();
        if let Some(interpretations) = interpretations {
            let raw: std::collections::HashMap<
                String,
                std::collections::HashMap<String, LensMeanings>,
            > = serde_json::from_str(interpretations).map_err(|source| CatalogError::Parse {
                what: "interpretations".to_string(),
                source,
            })?;

            for (card, systems) in raw {
                let mut lenses = std::collections::HashMap::new();
                for (system, mut meanings) in systems {
                    // Unknown systems stay out of the catalog.
                    let Ok(lens) = system.parse::<Lens>() else {
                        tracing::debug!(%card, %system, "skipping unknown interpretation system");
                        continue;
                    };
                    let upright = meanings.remove(Variant::Primary.as_str()).unwrap_or_default();
                    let reversed = meanings.remove(Variant::Inverted.as_str()).unwrap_or_default();
                    lenses.insert(lens, [upright, reversed]);
                }
                by_lens.insert(card, lenses);
            }
        }

        Ok(Self { basic, by_lens })
    }

    /// The meaning to display for a card.
    ///
    /// A non-combined lens prefers its own interpretation and falls back to the
    /// basic meaning. `None` when the card is not in the catalog at all.
    #[must_use]
    pub fn meaning(&self, entity: &str, variant: Variant, lens: Lens) -> Option<&str> {
        let slot = variant_slot(variant);

        if lens != Lens::Combined {
            let interpreted = self
                .by_lens
                .get(entity)
                .and_then(|lenses| lenses.get(&lens))
                .map(|meanings| meanings[slot].as_str())
                .filter(|m| !m.is_empty());
            if interpreted.is_some() {
                return interpreted;
            }
        }

        self.basic.get(entity).map(|meanings| meanings[slot].as_str())
    }

    /// Number of cards with a basic meaning.
    #[must_use]
    pub fn len(&self) -> usize {
        self.basic.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.basic.is_empty()
    }
}

fn variant_slot(variant: Variant) -> usize {
    match variant {
        Variant::Primary => 0,
        Variant::Inverted => 1,
    }
}

fn read(path: &std::path::Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}
