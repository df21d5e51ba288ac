use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Side;
use crate::stages::CursorSet;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unknown label `{label}` at position {position} of utterance {utterance}")]
    Classification {
        utterance: String,
        position: usize,
        label: String,
    },

    #[error("{0}")]
    MalformedRow(Box<MalformedRow>),

    #[error("missing external asset at `{}`", path.display())]
    MissingExternalAsset { path: PathBuf },
}

impl AnalysisError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::MalformedRow(_))
    }
}

impl From<MalformedRow> for AnalysisError {
    fn from(row: MalformedRow) -> Self {
        AnalysisError::MalformedRow(Box::new(row))
    }
}

/// A source cursor ran past its column outside the end-of-sequence case
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRow {
    pub utterance: String,
    /// Position in the combined label sequence
    pub position: usize,
    pub side: Side,
    pub reason: String,
    pub cursors: CursorSet,
    pub labels: Vec<String>,
    pub a_tokens: Vec<String>,
    pub b_tokens: Vec<String>,
    pub a_disfluency: Vec<String>,
    pub b_disfluency: Vec<String>,
}

impl MalformedRow {
    /// Multi-line dump of everything needed to reproduce the failure
    pub fn diagnostics(&self) -> String {
        format!(
            "utterance: {}\nposition: {} ({} side: {})\nlabels: {:?}\n\
             a cursor: {:?}\na tokens ({}): {:?}\na disfluency ({}): {:?}\n\
             b cursor: {:?}\nb tokens ({}): {:?}\nb disfluency ({}): {:?}",
            self.utterance,
            self.position,
            self.side,
            self.reason,
            self.labels,
            self.cursors.a,
            self.a_tokens.len(),
            self.a_tokens,
            self.a_disfluency.len(),
            self.a_disfluency,
            self.cursors.b,
            self.b_tokens.len(),
            self.b_tokens,
            self.b_disfluency.len(),
            self.b_disfluency,
        )
    }
}

impl fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed row {}: {} on side {} at position {} (cursor {:?})",
            self.utterance,
            self.reason,
            self.side,
            self.position,
            self.cursors.get(self.side)
        )
    }
}
