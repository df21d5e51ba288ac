use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{AnalyzedSegment, Side, TokenView, ViewSummary, WordCount};

/// Output file format for segment records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Tsv,
    Jsonl,
}

/// One flat output row: segment fields, then A-view fields, then B-view fields
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    columns: Vec<(String, Value)>,
}

impl SegmentRecord {
    pub fn from_segment(analyzed: &AnalyzedSegment) -> Self {
        let segment = &analyzed.segment;
        let summary = &analyzed.summary;

        let mut columns = vec![
            ("id".to_string(), json!(segment.utterance_id)),
            ("row".to_string(), json!(segment.row_index)),
            ("transcriber".to_string(), json!(segment.transcriber)),
            ("error_type".to_string(), json!(summary.error_type)),
            ("at_boundary".to_string(), json!(segment.at_boundary)),
            (
                "labels".to_string(),
                json!(segment.labels.iter().map(|l| l.as_str()).collect::<Vec<_>>()),
            ),
        ];
        for side in [Side::A, Side::B] {
            let view_summary = match side {
                Side::A => &summary.a,
                Side::B => &summary.b,
            };
            columns.extend(view_columns(side, segment.view(side), view_summary));
        }

        Self { columns }
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Cells for a TSV line; absent values are empty, lists are JSON arrays
    pub fn tsv_cells(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|(_, value)| match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

impl Serialize for SegmentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn view_columns(side: Side, view: &TokenView, summary: &ViewSummary) -> Vec<(String, Value)> {
    let prefix = side.prefix();
    [
        ("tokens", json!(view.tokens)),
        ("shapes", json!(view.shapes)),
        ("primary_scores", json!(view.primary_scores)),
        ("secondary_scores", json!(view.secondary_scores)),
        ("disfluency", json!(view.disfluency)),
        ("shape", json!(summary.shape)),
        ("surprisal", json!(summary.surprisal)),
        ("secondary_surprisal", json!(summary.secondary_surprisal)),
        ("top_n", json!(summary.top_n)),
        ("disf_prev", json!(summary.disfluency.prev)),
        ("disf", json!(summary.disfluency.current)),
        ("disf_next", json!(summary.disfluency.next)),
    ]
    .into_iter()
    .map(|(name, value)| (format!("{}{}", prefix, name), value))
    .collect()
}

/// Write segment records in the requested format
pub fn write_records(path: &Path, records: &[SegmentRecord], format: OutputFormat) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Tsv => write_tsv(&mut writer, records)?,
        OutputFormat::Jsonl => write_jsonl(&mut writer, records)?,
    }
    writer.flush().context("Failed to flush output")?;
    Ok(())
}

/// Header line plus one line per record. Nothing is written for no records.
pub fn write_tsv<W: Write>(writer: &mut W, records: &[SegmentRecord]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    writeln!(writer, "{}", first.header().join("\t"))?;
    for record in records {
        writeln!(writer, "{}", record.tsv_cells().join("\t"))?;
    }
    Ok(())
}

pub fn write_jsonl<W: Write>(writer: &mut W, records: &[SegmentRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record).context("Failed to write JSON")?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Summary of an analysis run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub segments: usize,
    pub reference_side: Side,
    pub strict: bool,
    pub generated_at: String,
}

impl RunReport {
    pub fn new(
        rows_read: usize,
        rows_skipped: usize,
        segments: usize,
        reference_side: Side,
        strict: bool,
    ) -> Self {
        Self {
            rows_read,
            rows_skipped,
            segments,
            reference_side,
            strict,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Write a `word\tcount` table
pub fn write_top_n(path: &Path, words: &[WordCount]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", super::TOP_N_HEADER)?;
    for entry in words {
        writeln!(writer, "{}\t{}", entry.word, entry.count)?;
    }
    writer.flush().context("Failed to flush output")?;
    Ok(())
}
