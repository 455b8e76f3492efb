//! Rendering of search results.
//!
//! Every renderer builds the complete output in memory first, so a failure can
//! never leave half a result set on stdout. Structured forms contain nothing
//! but data; headers and status text belong to the narrative form or to stderr.

use arcana_core::{Lens, SearchResult, Variant};

/// Width of the narrative banner.
const RULE_WIDTH: usize = 70;

/// Meanings longer than this are shortened in narrative output.
const MEANING_PREVIEW_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("failed to serialize results")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse results")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize results as YAML")]
    SerializeYaml(#[source] serde_yaml::Error),

    #[error("failed to parse YAML results")]
    ParseYaml(#[source] serde_yaml::Error),

    #[error("unknown output format {0:?}, expected json, jsonl, yaml or text")]
    UnknownFormat(String),
}

/// Output contract for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// A pretty-printed JSON array.
    Json,
    /// One compact JSON object per line.
    JsonLines,
    /// A YAML sequence of mappings.
    Yaml,
    /// Numbered human-readable blocks.
    #[default]
    Text,
}

impl OutputFormat {
    /// Whether output is meant for machines.
    #[must_use]
    pub fn is_structured(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "json-lines" | "ndjson" => Ok(Self::JsonLines),
            "yaml" | "yml" => Ok(Self::Yaml),
            "text" | "human" => Ok(Self::Text),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::JsonLines => "jsonl",
            Self::Yaml => "yaml",
            Self::Text => "text",
        })
    }
}

/// Structured form of one result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultRecord {
    pub card_name: String,
    pub position: Variant,
    pub lens: Lens,
    /// Full-precision f32; parses back to the identical value in every
    /// structured form.
    pub similarity: f32,
    pub meaning: String,
}

impl From<&SearchResult> for ResultRecord {
    fn from(result: &SearchResult) -> Self {
        Self {
            card_name: result.entity.clone(),
            position: result.variant,
            lens: result.lens,
            similarity: result.score,
            meaning: result.text.clone(),
        }
    }
}

/// Narrative rendering knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    /// Print meanings in full instead of a preview.
    pub full_meaning: bool,
}

/// Render results in the requested form.
pub fn render(
    results: &[SearchResult],
    format: OutputFormat,
    options: TextOptions,
) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => render_json(results),
        OutputFormat::JsonLines => render_json_lines(results),
        OutputFormat::Yaml => render_yaml(results),
        OutputFormat::Text => Ok(render_text(results, options)),
    }
}

/// Pretty JSON array. An empty result set is `[]`.
pub fn render_json(results: &[SearchResult]) -> Result<String, FormatError> {
    let records: Vec<ResultRecord> = results.iter().map(ResultRecord::from).collect();
    let mut out = serde_json::to_string_pretty(&records).map_err(FormatError::Serialize)?;
    out.push('\n');
    Ok(out)
}

/// One object per line. An empty result set is an empty stream.
pub fn render_json_lines(results: &[SearchResult]) -> Result<String, FormatError> {
    let mut out = String::new();
    for result in results {
        let line =
            serde_json::to_string(&ResultRecord::from(result)).map_err(FormatError::Serialize)?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// YAML sequence. An empty result set is `[]`.
pub fn render_yaml(results: &[SearchResult]) -> Result<String, FormatError> {
    let records: Vec<ResultRecord> = results.iter().map(ResultRecord::from).collect();
    serde_yaml::to_string(&records).map_err(FormatError::SerializeYaml)
}

/// Numbered blocks under a banner.
#[must_use]
pub fn render_text(results: &[SearchResult], options: TextOptions) -> String {
    use std::fmt::Write as _;

    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}\nSEARCH RESULTS\n{rule}");

    if results.is_empty() {
        let _ = writeln!(out, "\nNo matching cards.");
        return out;
    }

    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n{}. {} ({})",
            i + 1,
            result.entity,
            result.variant.as_str().to_uppercase()
        );
        let _ = writeln!(out, "   Similarity: {:.4}", result.score);
        if result.lens != Lens::Combined {
            let _ = writeln!(out, "   Lens: {}", result.lens.label());
        }
        let meaning = if options.full_meaning {
            result.text.clone()
        } else {
            preview(&result.text)
        };
        let _ = writeln!(out, "   Meaning: {meaning}");
    }

    out
}

fn preview(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MEANING_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// Read back the output of [`render_json`].
pub fn parse_json(input: &str) -> Result<Vec<ResultRecord>, FormatError> {
    serde_json::from_str(input).map_err(FormatError::Parse)
}

/// Read back the output of [`render_json_lines`].
pub fn parse_json_lines(input: &str) -> Result<Vec<ResultRecord>, FormatError> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(FormatError::Parse))
        .collect()
}

/// Read back the output of [`render_yaml`].
pub fn parse_yaml(input: &str) -> Result<Vec<ResultRecord>, FormatError> {
    serde_yaml::from_str(input).map_err(FormatError::ParseYaml)
}
