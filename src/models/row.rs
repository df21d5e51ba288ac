use serde::Deserialize;

use super::Side;

/// Identity marker meaning "no token in this source at this slot"
pub const ABSENT_MARKER: &str = "None";
/// Suffix marking the first half of a split token
pub const SPLIT_SUFFIX: &str = "_a";

/// Per-source columns of an alignment row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceColumns {
    /// Detokenized surface tokens
    pub tokens: Vec<String>,
    /// Identity markers, one per alignment slot of this source
    pub names: Vec<String>,
    /// Lexical shape codes, aligned with `tokens`
    pub shapes: Vec<i64>,
    /// Primary (n-gram) probabilities; one trailing end-of-sentence entry
    pub primary_scores: Vec<f64>,
    /// Secondary (neural) probabilities; one trailing end-of-sentence entry
    pub secondary_scores: Vec<f64>,
    /// Disfluency tags; empty when the source carries no annotation
    #[serde(default)]
    pub disfluency: Vec<String>,
}

impl SourceColumns {
    /// Identity marker at a raw cursor; empty once the source is exhausted
    pub fn name_at(&self, cursor: usize) -> &str {
        self.names.get(cursor).map(String::as_str).unwrap_or("")
    }

    /// Number of tokens left after removing absent slots and split halves
    pub fn detokenized_len(&self) -> usize {
        self.names
            .iter()
            .filter(|n| n.as_str() != ABSENT_MARKER && !n.ends_with(SPLIT_SUFFIX))
            .count()
    }
}

/// One utterance: the combined edit script plus both sources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlignmentRow {
    /// Utterance identifier
    pub id: String,
    /// Transcriber of the utterance
    #[serde(default)]
    pub transcriber: String,
    /// Combined operation labels (wire spelling)
    pub labels: Vec<String>,
    /// Combined surface tokens, same length as `labels`
    #[serde(default)]
    pub tokens: Vec<String>,
    pub a: SourceColumns,
    pub b: SourceColumns,
}

/// Structural facts about one combined-label slot, derived once per position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotMeta {
    pub absent_a: bool,
    pub absent_b: bool,
    pub split_a: bool,
    pub split_b: bool,
}

impl SlotMeta {
    pub fn from_markers(name_a: &str, name_b: &str) -> Self {
        Self {
            absent_a: name_a == ABSENT_MARKER,
            absent_b: name_b == ABSENT_MARKER,
            split_a: name_a.ends_with(SPLIT_SUFFIX),
            split_b: name_b.ends_with(SPLIT_SUFFIX),
        }
    }

    /// Structural artifact present in neither source (e.g. a unit boundary)
    pub fn is_special(&self) -> bool {
        self.absent_a && self.absent_b
    }

    pub fn split(&self, side: Side) -> bool {
        match side {
            Side::A => self.split_a,
            Side::B => self.split_b,
        }
    }

    pub fn any_split(&self) -> bool {
        self.split_a || self.split_b
    }
}

/// A length inconsistency found by [`AlignmentRow::verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthMismatch {
    pub field: String,
    pub expected: usize,
    pub actual: usize,
}

impl AlignmentRow {
    pub fn source(&self, side: Side) -> &SourceColumns {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// Slot metadata for the markers under the given raw cursors
    pub fn slot_meta(&self, cursor_a: usize, cursor_b: usize) -> SlotMeta {
        SlotMeta::from_markers(self.a.name_at(cursor_a), self.b.name_at(cursor_b))
    }

    /// Check the column lengths against the identity markers
    pub fn verify(&self) -> Vec<LengthMismatch> {
        let mut mismatches = Vec::new();
        let mut check = |field: String, expected: usize, actual: usize| {
            if expected != actual {
                mismatches.push(LengthMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        };

        check("tokens".to_string(), self.labels.len(), self.tokens.len());

        for side in [Side::A, Side::B] {
            let source = self.source(side);
            let gold = source.detokenized_len();
            let prefix = side.prefix();
            check(format!("{}tokens", prefix), gold, source.tokens.len());
            check(format!("{}shapes", prefix), gold, source.shapes.len());
            check(
                format!("{}primary_scores", prefix),
                gold + 1,
                source.primary_scores.len(),
            );
            check(
                format!("{}secondary_scores", prefix),
                gold + 1,
                source.secondary_scores.len(),
            );
        }

        mismatches
    }
}
