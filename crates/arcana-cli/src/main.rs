//! CLI for semantic tarot card search.

// CLI binaries need to print user-facing output
#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "CLI binary needs stdout for results and stderr for status"
)]

use std::io::{BufRead as _, Write as _};
use std::sync::Arc;

use arcana_core::{Lens, LensSet, Variant};
use arcana_format::{OutputFormat, TextOptions};
use arcana_inference::{EmbedderConfig, OpenAiEmbedder};
use arcana_search::{Searcher, SimilarQuery, TextQuery};
use arcana_store::{Catalog, EmbeddingStore, LoadOptions};
use eyre::WrapErr as _;

/// Result count per query in the interactive loop.
const INTERACTIVE_LIMIT: usize = 5;

/// Card names listed when a lookup misses.
const SUGGESTION_COUNT: usize = 10;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let searcher = args.corpus.open()?;

    match args.command {
        Command::Search {
            query,
            lens,
            variant,
            limit,
            output,
        } => {
            let embedder = args.embedding.connect()?;
            let query_opts = TextQuery {
                lens,
                variant,
                limit,
            };
            if !output.format.is_structured() {
                eprintln!("Searching for: '{query}'");
            }
            let results = searcher
                .search_text(&embedder, &query, &query_opts)
                .wrap_err("text search failed")?;
            output.print(&results)?;
        }
        Command::Similar {
            card,
            reversed,
            include_same_card,
            lens,
            limit,
            output,
        } => {
            let entity = resolve_card(searcher.store(), &card)?;
            let variant = if reversed {
                Variant::Inverted
            } else {
                Variant::Primary
            };
            if !output.format.is_structured() {
                eprintln!("Finding cards similar to: {entity} ({variant})");
            }
            let results = searcher
                .find_similar(
                    &entity,
                    &SimilarQuery {
                        variant,
                        lens,
                        include_same_card,
                        limit,
                    },
                )
                .wrap_err_with(|| format!("similar-card search for {entity} failed"))?;
            output.print(&results)?;
        }
        Command::Interactive { lens, output } => {
            let embedder = match args.embedding.connect() {
                Ok(embedder) => Some(embedder),
                Err(e) => {
                    tracing::warn!(error = %e, "text search disabled");
                    None
                }
            };
            interactive(&searcher, embedder.as_ref(), lens, &output)?;
        }
        Command::Lenses => {
            let store = searcher.store();
            eprintln!(
                "{} cards, {} records, dimension {}",
                store.entity_names().len(),
                store.len(),
                store.dimension()
            );
            let mut out = String::new();
            for lens in store.lenses().iter() {
                let marker = if lens == store.default_lens() {
                    " (default)"
                } else {
                    ""
                };
                out.push_str(&format!("{lens}\t{}{marker}\n", lens.label()));
            }
            print!("{out}");
        }
    }

    Ok(())
}

use clap::Parser as _;

#[derive(clap::Parser)]
#[command(name = "arcana")]
#[command(about = "Semantic search over tarot card interpretations")]
struct Args {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Find cards whose meaning matches a free-text query
    Search {
        /// The search query
        query: String,

        /// Interpretation lens to search under
        #[arg(long)]
        lens: Option<Lens>,

        /// Only return upright or reversed cards
        #[arg(long)]
        variant: Option<Variant>,

        /// Maximum number of results
        #[arg(short = 'k', long = "top", default_value_t = arcana_search::DEFAULT_LIMIT)]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find cards whose meaning is closest to a given card
    Similar {
        /// Card name, matched case-insensitively
        card: String,

        /// Use the reversed meaning of the card as the query
        #[arg(long)]
        reversed: bool,

        /// Keep both positions of the query card in the results
        #[arg(long)]
        include_same_card: bool,

        /// Interpretation lens to search under
        #[arg(long)]
        lens: Option<Lens>,

        /// Maximum number of results
        #[arg(short = 'k', long = "top", default_value_t = arcana_search::DEFAULT_LIMIT)]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read queries from stdin until `/quit` or end of input
    Interactive {
        /// Interpretation lens to search under
        #[arg(long)]
        lens: Option<Lens>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the interpretation lenses in the corpus
    Lenses,
}

#[derive(clap::Args)]
struct CorpusArgs {
    /// Embedding corpus (JSON array of card records)
    #[arg(long, global = true, env = "ARCANA_CORPUS", default_value = "card_embeddings.json")]
    corpus: std::path::PathBuf,

    /// Card catalog with basic meanings, used for display text
    #[arg(long, global = true, env = "ARCANA_CARDS")]
    cards: Option<std::path::PathBuf>,

    /// Per-lens interpretations, used with --cards
    #[arg(long, global = true, env = "ARCANA_INTERPRETATIONS", requires = "cards")]
    interpretations: Option<std::path::PathBuf>,

    /// Lenses the corpus must cover, comma separated (inferred when unset)
    #[arg(long, global = true, value_delimiter = ',')]
    lens_set: Vec<Lens>,

    /// Expected embedding dimension (taken from the first record when unset)
    #[arg(long, global = true)]
    dimension: Option<usize>,
}

impl CorpusArgs {
    fn open(&self) -> eyre::Result<Searcher> {
        let lenses = if self.lens_set.is_empty() {
            None
        } else {
            Some(LensSet::new(self.lens_set.iter().copied()).wrap_err("invalid --lens-set")?)
        };
        let options = LoadOptions {
            lenses,
            dimension: self.dimension,
        };

        let store = EmbeddingStore::load(&self.corpus, &options)
            .wrap_err_with(|| format!("failed to load corpus {}", self.corpus.display()))?;
        let mut searcher = Searcher::new(Arc::new(store));

        if let Some(cards) = &self.cards {
            let catalog = Catalog::load(cards, self.interpretations.as_deref())
                .wrap_err_with(|| format!("failed to load card catalog {}", cards.display()))?;
            searcher = searcher.with_catalog(Arc::new(catalog));
        }

        Ok(searcher)
    }
}

#[derive(clap::Args)]
struct EmbeddingArgs {
    /// API key for the embedding service
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Embedding service base URL
    #[arg(long, global = true, env = "ARCANA_EMBEDDING_URL", default_value = arcana_inference::DEFAULT_BASE_URL)]
    embedding_url: String,

    /// Embedding model; must match the one the corpus was built with
    #[arg(long, global = true, env = "ARCANA_EMBEDDING_MODEL", default_value = arcana_inference::DEFAULT_MODEL)]
    embedding_model: String,

    /// Seconds to wait for the embedding service
    #[arg(long, global = true, env = "ARCANA_EMBEDDING_TIMEOUT_SECS", default_value_t = 30)]
    embedding_timeout_secs: u64,
}

impl EmbeddingArgs {
    fn connect(&self) -> eyre::Result<OpenAiEmbedder> {
        OpenAiEmbedder::new(EmbedderConfig {
            base_url: self.embedding_url.clone(),
            model: self.embedding_model.clone(),
            api_key: self.api_key.clone(),
            timeout: std::time::Duration::from_secs(self.embedding_timeout_secs),
        })
        .wrap_err("failed to set up the embedding service client")
    }
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format: json, jsonl, yaml or text
    #[arg(long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print meanings in full in text output
    #[arg(long)]
    full: bool,
}

impl OutputArgs {
    /// Render everything first so a failure never leaves partial output.
    fn print(&self, results: &[arcana_core::SearchResult]) -> eyre::Result<()> {
        let rendered = arcana_format::render(
            results,
            self.format,
            TextOptions {
                full_meaning: self.full,
            },
        )
        .wrap_err("failed to render results")?;

        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .and_then(|()| stdout.flush())
            .wrap_err("failed to write results")
    }
}

/// Map user input to the stored card name, ignoring case.
fn resolve_card(store: &EmbeddingStore, name: &str) -> eyre::Result<String> {
    match store.resolve_entity_name(name) {
        Some(entity) => Ok(entity.to_string()),
        None => {
            let suggestions = store
                .entity_names()
                .iter()
                .take(SUGGESTION_COUNT)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            eyre::bail!("card {name:?} not found; available cards include: {suggestions}, ...")
        }
    }
}

fn interactive(
    searcher: &Searcher,
    embedder: Option<&OpenAiEmbedder>,
    lens: Option<Lens>,
    output: &OutputArgs,
) -> eyre::Result<()> {
    eprintln!("Tarot card search. Type a query, `/similar <card>`, or `/quit`.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(line) = prompt(&mut lines, "\nQuery: ")? else {
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if matches!(line, "/quit" | "/exit" | "/q") {
            break;
        }

        let outcome = if let Some(card) = similar_command(line) {
            if card.is_empty() {
                eprintln!("Usage: /similar <card name>");
                continue;
            }
            let Some(answer) = prompt(&mut lines, "Position (u/r, default: u): ")? else {
                break;
            };
            let variant = if matches!(answer.trim().to_ascii_lowercase().as_str(), "r" | "reversed")
            {
                Variant::Inverted
            } else {
                Variant::Primary
            };
            similar_once(searcher, card, variant, lens, output)
        } else {
            match embedder {
                Some(embedder) => {
                    let query = TextQuery {
                        lens,
                        variant: None,
                        limit: INTERACTIVE_LIMIT,
                    };
                    searcher
                        .search_text(embedder, line, &query)
                        .wrap_err("text search failed")
                        .and_then(|results| output.print(&results))
                }
                None => Err(eyre::eyre!(
                    "text search needs an embedding service API key (set OPENAI_API_KEY)"
                )),
            }
        };

        if let Err(e) = outcome {
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}

/// The card argument when `line` is a `/similar` command.
///
/// The command word must stand alone, so `/similarity of paths` is a text query.
fn similar_command(line: &str) -> Option<&str> {
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    (command == "/similar").then(|| rest.trim())
}

fn similar_once(
    searcher: &Searcher,
    card: &str,
    variant: Variant,
    lens: Option<Lens>,
    output: &OutputArgs,
) -> eyre::Result<()> {
    let entity = resolve_card(searcher.store(), card)?;
    let results = searcher
        .find_similar(
            &entity,
            &SimilarQuery {
                variant,
                lens,
                include_same_card: false,
                limit: INTERACTIVE_LIMIT,
            },
        )
        .wrap_err_with(|| format!("similar-card search for {entity} failed"))?;
    output.print(&results)
}

/// Show `message` on stderr and read one line. `None` at end of input.
fn prompt(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    message: &str,
) -> eyre::Result<Option<String>> {
    eprint!("{message}");
    std::io::stderr().flush().wrap_err("failed to flush prompt")?;
    lines
        .next()
        .transpose()
        .wrap_err("failed to read from stdin")
}
