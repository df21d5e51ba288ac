use serde::Serialize;

use super::{FrequentWords, Label, Side, TokenView, ViewSummary};

/// Kind of disagreement covered by a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Insert,
    Delete,
    Substitution,
    Mixed,
}

impl ErrorType {
    /// Classify from the raw labels observed while the segment was open
    pub fn classify(labels: &[Label]) -> Self {
        let has_insert = labels.contains(&Label::InsertA);
        let has_delete = labels.contains(&Label::DeleteA);
        let has_substitution = labels.iter().any(|l| l.is_substitution());

        match (has_insert, has_delete, has_substitution) {
            (false, false, _) => ErrorType::Substitution,
            (true, false, false) => ErrorType::Insert,
            (false, true, false) => ErrorType::Delete,
            _ => ErrorType::Mixed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Insert => "INSERT",
            ErrorType::Delete => "DELETE",
            ErrorType::Substitution => "SUBSTITUTION",
            ErrorType::Mixed => "MIXED",
        }
    }
}

/// A maximal run of error labels plus its closing context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorSegment {
    /// Index of the utterance row the segment came from
    pub row_index: usize,
    pub utterance_id: String,
    pub transcriber: String,
    /// Raw labels observed while the segment was open, closing label included
    pub labels: Vec<Label>,
    /// Pure deletion at the first or last slot of the utterance
    pub at_boundary: bool,
    pub a: TokenView,
    pub b: TokenView,
}

/// Segment statistics, one [`ViewSummary`] per side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSummary {
    pub error_type: ErrorType,
    pub a: ViewSummary,
    pub b: ViewSummary,
}

/// A closed segment together with its statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedSegment {
    pub segment: ErrorSegment,
    pub summary: SegmentSummary,
}

impl ErrorSegment {
    pub fn view(&self, side: Side) -> &TokenView {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    pub fn view_mut(&mut self, side: Side) -> &mut TokenView {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }

    pub fn summarize(&self, top_n: &FrequentWords) -> SegmentSummary {
        SegmentSummary {
            error_type: ErrorType::classify(&self.labels),
            a: self.a.summarize(top_n, &self.b),
            b: self.b.summarize(top_n, &self.a),
        }
    }

    /// Summarize and hand the segment off as a finished result
    pub fn finalize(self, top_n: &FrequentWords) -> AnalyzedSegment {
        let summary = self.summarize(top_n);
        AnalyzedSegment {
            segment: self,
            summary,
        }
    }
}
