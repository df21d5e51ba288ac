use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::AnalysisError;
use crate::models::{AlignmentRow, FrequentWords};

/// Parse a JSON Lines alignment file into rows
pub fn parse_rows_file(path: &Path) -> Result<Vec<AlignmentRow>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_rows_jsonl(&content)
}

/// Parse JSON Lines content, one `AlignmentRow` per non-blank line
pub fn parse_rows_jsonl(content: &str) -> Result<Vec<AlignmentRow>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse alignment row on line {}", i + 1))
        })
        .collect()
}

/// Load the top-N frequent-word table written by the `top-n` command.
///
/// A missing file is a [`AnalysisError::MissingExternalAsset`].
pub fn load_top_n(path: &Path) -> Result<FrequentWords> {
    if !path.exists() {
        return Err(AnalysisError::MissingExternalAsset {
            path: path.to_path_buf(),
        }
        .into());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    Ok(parse_top_n_tsv(&content))
}

/// Header written by `write_top_n`
pub const TOP_N_HEADER: &str = "word\tcount";

/// Words from a `word\tcount` table; a leading header line is skipped
pub fn parse_top_n_tsv(content: &str) -> FrequentWords {
    let mut lines = content.lines().peekable();
    if lines.next_if(|line| line.trim() == TOP_N_HEADER).is_some() {
        debug!("Skipping top-N header");
    }
    FrequentWords::new(
        lines
            .filter_map(|line| line.split('\t').next())
            .filter(|word| !word.is_empty()),
    )
}
