use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult, MalformedRow};
use crate::models::{
    AlignmentRow, AnalyzedSegment, ErrorSegment, FrequentWords, Label, Side, SlotMeta, TokenView,
    FLUENT_TAG,
};

use super::CursorSet;

/// Score pair used for the end-of-sequence sentinel when a source has no
/// trailing end-of-sentence score
pub const EOS_SENTINEL_SCORE: f64 = 0.01;

/// Parse every label of a row up front; unknown labels are fatal
pub fn classify_labels(row: &AlignmentRow) -> AnalysisResult<Vec<Label>> {
    row.labels
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            raw.parse::<Label>()
                .map_err(|label| AnalysisError::Classification {
                    utterance: row.id.clone(),
                    position,
                    label,
                })
        })
        .collect()
}

/// Per-row walker that carves error segments out of the combined labels.
///
/// The builder is IDLE while `open` is `None` and OPEN otherwise.
pub struct SegmentBuilder<'a> {
    row: &'a AlignmentRow,
    row_index: usize,
    reference: Side,
    top_n: &'a FrequentWords,
    cursors: CursorSet,
    open: Option<ErrorSegment>,
    emitted: Vec<AnalyzedSegment>,
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(
        row: &'a AlignmentRow,
        row_index: usize,
        reference: Side,
        top_n: &'a FrequentWords,
    ) -> Self {
        Self {
            row,
            row_index,
            reference,
            top_n,
            cursors: CursorSet::default(),
            open: None,
            emitted: Vec::new(),
        }
    }

    pub fn cursors(&self) -> CursorSet {
        self.cursors
    }

    /// Consume the label at `position` of the combined sequence
    pub fn step(&mut self, position: usize, label: Label) -> AnalysisResult<()> {
        let meta = self.row.slot_meta(self.cursors.a.raw, self.cursors.b.raw);

        if !meta.is_special() {
            if label.is_error(self.reference) {
                self.consume(position, label, meta)?;
            } else if self.open.is_some() {
                // closing context; held open while either side is mid-split
                self.consume(position, label, meta)?;
                if !meta.any_split() {
                    self.close();
                }
            }
        }

        self.cursors = self.cursors.advance(label, meta);
        Ok(())
    }

    /// Close any open segment with the end-of-sequence sentinel and return
    /// everything emitted for the row
    pub fn finish(mut self) -> AnalysisResult<Vec<AnalyzedSegment>> {
        let row = self.row;
        let cursors = self.cursors;
        if let Some(segment) = self.open.as_mut() {
            let position = row.labels.len();
            for side in [Side::A, Side::B] {
                let source = row.source(side);
                let detok = cursors.get(side).detok;
                let score = |scores: &[f64], column: &str| match scores.get(detok) {
                    Some(&p) => probability(p, column, detok)
                        .map_err(|reason| malformed_row(row, cursors, position, side, reason)),
                    None => Ok(EOS_SENTINEL_SCORE),
                };
                let primary = score(&source.primary_scores, "primary")?;
                let secondary = score(&source.secondary_scores, "secondary")?;
                segment.view_mut(side).set_end_of_sequence(primary, secondary);
            }
            self.close();
        }
        Ok(self.emitted)
    }

    fn close(&mut self) {
        if let Some(segment) = self.open.take() {
            debug!(
                utterance = %segment.utterance_id,
                labels = segment.labels.len(),
                "closing error segment"
            );
            self.emitted.push(segment.finalize(self.top_n));
        }
    }

    fn consume(&mut self, position: usize, label: Label, meta: SlotMeta) -> AnalysisResult<()> {
        let row = self.row;
        let row_index = self.row_index;
        let opening = self.open.is_none();
        let segment = self.open.get_or_insert_with(|| ErrorSegment {
            row_index,
            utterance_id: row.id.clone(),
            transcriber: row.transcriber.clone(),
            ..Default::default()
        });
        segment.labels.push(label);

        for side in [Side::A, Side::B] {
            if !label.advances(side) || meta.split(side) {
                continue;
            }
            read_slot(
                row,
                self.cursors,
                position,
                side,
                opening,
                segment.view_mut(side),
            )?;
        }

        let last = row.labels.len().saturating_sub(1);
        if label == Label::DeleteA && !meta.split_b && (position == 0 || position == last) {
            segment.at_boundary = true;
        }
        Ok(())
    }
}

/// Append the token under `side`'s cursor to `view`
fn read_slot(
    row: &AlignmentRow,
    cursors: CursorSet,
    position: usize,
    side: Side,
    opening: bool,
    view: &mut TokenView,
) -> Result<(), MalformedRow> {
    let source = row.source(side);
    let cursor = cursors.get(side);
    let malformed = |reason: String| malformed_row(row, cursors, position, side, reason);
    let missing = |column: &str, index: usize| {
        malformed(format!("{} index {} out of bounds", column, index))
    };

    let token = source
        .tokens
        .get(cursor.detok)
        .ok_or_else(|| missing("token", cursor.detok))?;
    let shape = *source
        .shapes
        .get(cursor.detok)
        .ok_or_else(|| missing("shape", cursor.detok))?;
    let primary = *source
        .primary_scores
        .get(cursor.detok)
        .ok_or_else(|| missing("primary score", cursor.detok))?;
    let secondary = *source
        .secondary_scores
        .get(cursor.detok)
        .ok_or_else(|| missing("secondary score", cursor.detok))?;
    let primary = probability(primary, "primary", cursor.detok).map_err(malformed)?;
    let secondary = probability(secondary, "secondary", cursor.detok).map_err(malformed)?;

    let annotated = !source.disfluency.is_empty();
    let tag = if annotated {
        source
            .disfluency
            .get(cursor.disfluency)
            .map(String::as_str)
            .ok_or_else(|| missing("disfluency", cursor.disfluency))?
    } else {
        FLUENT_TAG
    };
    // in bounds: the tag at the current cursor was found above
    let lookbehind = match cursor.disfluency.checked_sub(1) {
        Some(prev) if annotated => source.disfluency[prev].as_str(),
        _ => FLUENT_TAG,
    };

    if opening {
        view.set_disfluency(lookbehind);
    }
    view.set_token(token, shape)
        .map_err(|e| malformed(e.to_string()))?;
    view.set_score(primary, secondary);
    view.set_disfluency(tag);
    Ok(())
}

/// Accept only scores in (0, 1]; NaN fails both comparisons
fn probability(score: f64, column: &str, index: usize) -> Result<f64, String> {
    if score > 0.0 && score <= 1.0 {
        Ok(score)
    } else {
        Err(format!(
            "{} score {} at index {} is not a probability",
            column, score, index
        ))
    }
}

fn malformed_row(
    row: &AlignmentRow,
    cursors: CursorSet,
    position: usize,
    side: Side,
    reason: String,
) -> MalformedRow {
    MalformedRow {
        utterance: row.id.clone(),
        position,
        side,
        reason,
        cursors,
        labels: row.labels.clone(),
        a_tokens: row.a.tokens.clone(),
        b_tokens: row.b.tokens.clone(),
        a_disfluency: row.a.disfluency.clone(),
        b_disfluency: row.b.disfluency.clone(),
    }
}

/// Walk one row and return its summarized segments in emission order
pub fn segment_row(
    row: &AlignmentRow,
    row_index: usize,
    reference: Side,
    top_n: &FrequentWords,
) -> AnalysisResult<Vec<AnalyzedSegment>> {
    let labels = classify_labels(row)?;
    let mut builder = SegmentBuilder::new(row, row_index, reference, top_n);
    for (position, label) in labels.into_iter().enumerate() {
        builder.step(position, label)?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorType, ShapeCategory, SourceColumns};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// A source whose markers are all plain tokens
    fn source(prefix: &str, tokens: &[&str]) -> SourceColumns {
        let names: Vec<String> = (0..tokens.len()).map(|i| format!("{}{}", prefix, i)).collect();
        source_with_names(tokens, &names.iter().map(String::as_str).collect::<Vec<_>>())
    }

    fn source_with_names(tokens: &[&str], names: &[&str]) -> SourceColumns {
        let mut primary = vec![0.5; tokens.len()];
        primary.push(0.25);
        SourceColumns {
            tokens: strings(tokens),
            names: strings(names),
            shapes: vec![1; tokens.len()],
            secondary_scores: primary.clone(),
            primary_scores: primary,
            disfluency: vec!["O".to_string(); tokens.len()],
        }
    }

    fn row(labels: &[&str], a: SourceColumns, b: SourceColumns) -> AlignmentRow {
        AlignmentRow {
            id: "sw2005_12_3".to_string(),
            transcriber: "CDW".to_string(),
            labels: strings(labels),
            tokens: strings(labels),
            a,
            b,
        }
    }

    fn walk(row: &AlignmentRow, reference: Side) -> (CursorSet, Vec<AnalyzedSegment>) {
        let top = FrequentWords::new(["uh", "i"]);
        let labels = classify_labels(row).unwrap();
        let mut builder = SegmentBuilder::new(row, 0, reference, &top);
        for (position, label) in labels.into_iter().enumerate() {
            builder.step(position, label).unwrap();
        }
        let cursors = builder.cursors();
        (cursors, builder.finish().unwrap())
    }

    #[test]
    fn test_single_insertion() {
        let row = row(
            &["O", "INS", "O"],
            source("t", &["i", "uh", "think"]),
            source("m", &["i", "think"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        assert_eq!(cursors.a.raw, 3);
        assert_eq!(cursors.b.raw, 2);
        assert_eq!(segments.len(), 1);

        let analyzed = &segments[0];
        assert_eq!(analyzed.summary.error_type, ErrorType::Insert);
        assert!(!analyzed.segment.at_boundary);
        assert_eq!(analyzed.segment.utterance_id, "sw2005_12_3");
        assert_eq!(analyzed.segment.transcriber, "CDW");
        assert_eq!(analyzed.segment.labels, vec![Label::InsertA, Label::Aligned]);
        assert_eq!(analyzed.segment.a.tokens, vec!["uh", "think"]);
        assert_eq!(analyzed.segment.b.tokens, vec!["think"]);
        assert_eq!(analyzed.segment.a.primary_scores.len(), 2);
        // lookbehind, error token, context
        assert_eq!(analyzed.segment.a.disfluency.len(), 3);
        assert!(analyzed.summary.a.top_n);
        assert_eq!(analyzed.summary.b.surprisal, None);
    }

    #[test]
    fn test_no_errors_no_segments() {
        let row = row(
            &["O", "O", "CONT_TREE"],
            source("t", &["so", "yeah", "i"]),
            source("m", &["so", "yeah"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        assert!(segments.is_empty());
        assert_eq!(cursors.a.raw, 3);
        assert_eq!(cursors.b.raw, 2);
    }

    #[test]
    fn test_deletion_is_not_an_error_for_reference_a() {
        let row = row(
            &["O", "DEL", "O"],
            source("t", &["i", "think"]),
            source("m", &["i", "uh", "think"]),
        );

        let (_, segments) = walk(&row, Side::A);
        assert!(segments.is_empty());

        let (_, segments) = walk(&row, Side::B);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].summary.error_type, ErrorType::Delete);
        assert_eq!(segments[0].segment.b.tokens, vec!["uh", "think"]);
    }

    #[test]
    fn test_run_at_row_end_closes_with_eos() {
        let row = row(
            &["O", "SUB_TREE", "SUB_MS"],
            source("t", &["i", "the"]),
            source("m", &["i", "a"]),
        );

        let (_, segments) = walk(&row, Side::A);

        assert_eq!(segments.len(), 1);
        let segment = &segments[0].segment;
        assert_eq!(segments[0].summary.error_type, ErrorType::Substitution);
        assert_eq!(segment.a.tokens, vec!["the", "<EOS>"]);
        assert_eq!(segment.b.tokens, vec!["a", "<EOS>"]);
        assert_eq!(segment.a.shapes.last(), Some(&ShapeCategory::EndOfSequence));
        assert_eq!(segment.b.shapes.last(), Some(&ShapeCategory::EndOfSequence));
        // trailing end-of-sentence score
        assert_eq!(segment.a.primary_scores, vec![0.5, 0.25]);
    }

    #[test]
    fn test_eos_falls_back_to_sentinel_score() {
        let mut a = source("t", &["i", "uh"]);
        a.primary_scores.pop();
        a.secondary_scores.pop();
        let row = row(&["O", "INS"], a, source("m", &["i"]));

        let (_, segments) = walk(&row, Side::A);

        let view = &segments[0].segment.a;
        assert_eq!(view.primary_scores, vec![0.5, EOS_SENTINEL_SCORE]);
        assert_eq!(view.secondary_scores, vec![0.5, EOS_SENTINEL_SCORE]);
    }

    #[test]
    fn test_deletion_at_first_position_marks_boundary() {
        let row = row(
            &["DEL", "O"],
            source("t", &["yeah"]),
            source("m", &["uh", "yeah"]),
        );

        let (_, segments) = walk(&row, Side::B);

        assert_eq!(segments.len(), 1);
        assert!(segments[0].segment.at_boundary);
        assert_eq!(segments[0].segment.b.tokens, vec!["uh", "yeah"]);
        assert_eq!(segments[0].segment.a.tokens, vec!["yeah"]);
    }

    #[test]
    fn test_deletion_at_last_position_marks_boundary() {
        let row = row(
            &["O", "DEL"],
            source("t", &["yeah"]),
            source("m", &["yeah", "uh"]),
        );

        let (_, segments) = walk(&row, Side::B);

        assert_eq!(segments.len(), 1);
        assert!(segments[0].segment.at_boundary);
        assert_eq!(segments[0].segment.b.tokens, vec!["uh", "<EOS>"]);
        assert_eq!(segments[0].segment.a.tokens, vec!["<EOS>"]);
    }

    #[test]
    fn test_deletion_as_closing_context_marks_boundary() {
        let row = row(&["INS", "DEL"], source("t", &["uh"]), source("m", &["yeah"]));

        let (_, segments) = walk(&row, Side::A);

        assert_eq!(segments.len(), 1);
        let analyzed = &segments[0];
        assert!(analyzed.segment.at_boundary);
        assert_eq!(analyzed.segment.labels, vec![Label::InsertA, Label::DeleteA]);
        assert_eq!(analyzed.summary.error_type, ErrorType::Mixed);
        assert_eq!(analyzed.segment.a.tokens, vec!["uh"]);
        assert_eq!(analyzed.segment.b.tokens, vec!["yeah"]);
    }

    #[test]
    fn test_reconciled_label_closes_like_aligned() {
        let row = row(
            &["O", "SUB_TREE", "SUB_MS", "CONT", "O"],
            source("t", &["i", "the", "dog", "ran"]),
            source("m", &["i", "a", "dog", "ran"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        assert_eq!(segments.len(), 1);
        let analyzed = &segments[0];
        assert_eq!(analyzed.summary.error_type, ErrorType::Substitution);
        assert_eq!(
            analyzed.segment.labels,
            vec![Label::SubstituteA, Label::SubstituteB, Label::Reconciled]
        );
        assert_eq!(analyzed.segment.a.tokens, vec!["the", "dog"]);
        assert_eq!(analyzed.segment.b.tokens, vec!["a", "dog"]);
        assert_eq!(cursors.a.raw, 4);
        assert_eq!(cursors.b.raw, 4);
    }

    #[test]
    fn test_special_slot_is_skipped() {
        let row = row(
            &["O", "O", "INS", "O"],
            source_with_names(&["i", "uh", "so"], &["t0", "None", "t2", "t3"]),
            source_with_names(&["i", "so"], &["m0", "None", "m2"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment.a.tokens, vec!["uh", "so"]);
        assert_eq!(segments[0].segment.b.tokens, vec!["so"]);
        assert_eq!(cursors.a.raw, 4);
        assert_eq!(cursors.a.detok, 3);
        assert_eq!(cursors.b.raw, 3);
        assert_eq!(cursors.b.detok, 2);
    }

    #[test]
    fn test_close_waits_for_split_to_resolve() {
        let row = row(
            &["INS", "O", "O", "O"],
            source_with_names(&["uh", "don't", "go"], &["t0", "t1_a", "t1_b", "t2"]),
            source("m", &["don", "'t", "go"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        assert_eq!(segments.len(), 1);
        let segment = &segments[0].segment;
        assert_eq!(segment.labels, vec![Label::InsertA, Label::Aligned, Label::Aligned]);
        assert_eq!(segment.a.tokens, vec!["uh", "don't"]);
        assert_eq!(segment.b.tokens, vec!["don", "'t"]);
        assert_eq!(segment.a.primary_scores.len(), segment.a.tokens.len());
        assert_eq!(cursors.a.detok, 3);
    }

    #[test]
    fn test_error_on_other_side_while_split_pending_extends_segment() {
        let row = row(
            &["INS", "O", "SUB_MS", "O"],
            source_with_names(&["uh", "don't"], &["t0", "t1_a", "t1_b"]),
            source("m", &["x", "y", "z"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        assert_eq!(segments.len(), 1);
        let analyzed = &segments[0];
        assert_eq!(analyzed.summary.error_type, ErrorType::Mixed);
        assert_eq!(analyzed.segment.a.tokens, vec!["uh", "don't"]);
        assert_eq!(analyzed.segment.b.tokens, vec!["x", "y", "z"]);
        assert_eq!(cursors.a.raw, 3);
        assert_eq!(cursors.b.raw, 3);
    }

    #[test]
    fn test_disfluency_lookbehind_recorded_once() {
        let mut a = source("t", &["i", "uh", "uh", "think"]);
        a.disfluency = strings(&["E", "F", "F", "O"]);
        let row = row(&["O", "INS", "INS", "O"], a, source("m", &["i", "think"]));

        let (_, segments) = walk(&row, Side::A);

        let view = &segments[0].segment.a;
        assert_eq!(view.disfluency, strings(&["E", "F", "F", "O"]));
        let flags = segments[0].summary.a.disfluency;
        assert!(flags.prev);
        assert!(flags.current);
        assert!(!flags.next);
    }

    #[test]
    fn test_missing_disfluency_reads_fluent() {
        let mut a = source("t", &["i", "uh", "think"]);
        a.disfluency.clear();
        let row = row(&["O", "INS", "O"], a, source("m", &["i", "think"]));

        let (_, segments) = walk(&row, Side::A);

        assert_eq!(segments[0].segment.a.disfluency, strings(&["O", "O", "O"]));
    }

    #[test]
    fn test_exhausted_source_is_malformed() {
        let row = row(
            &["O", "INS", "O"],
            source_with_names(&["i"], &["t0", "t1", "t2"]),
            source("m", &["i", "think"]),
        );
        let top = FrequentWords::default();

        let err = segment_row(&row, 4, Side::A, &top).unwrap_err();

        match err {
            AnalysisError::MalformedRow(malformed) => {
                assert_eq!(malformed.position, 1);
                assert_eq!(malformed.side, Side::A);
                assert_eq!(malformed.cursors.a.detok, 1);
                assert!(malformed.diagnostics().contains("sw2005_12_3"));
            }
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_score_is_malformed() {
        let mut a = source("t", &["i", "uh", "think"]);
        a.primary_scores[1] = 0.0;
        let row = row(&["O", "INS", "O"], a, source("m", &["i", "think"]));
        let top = FrequentWords::default();

        let err = segment_row(&row, 0, Side::A, &top).unwrap_err();

        match err {
            AnalysisError::MalformedRow(malformed) => {
                assert_eq!(malformed.position, 1);
                assert_eq!(malformed.side, Side::A);
                assert_eq!(malformed.reason, "primary score 0 at index 1 is not a probability");
            }
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_eos_score_is_malformed() {
        let mut a = source("t", &["i", "uh"]);
        a.secondary_scores[2] = f64::NAN;
        let row = row(&["O", "INS"], a, source("m", &["i"]));
        let top = FrequentWords::default();

        let err = segment_row(&row, 0, Side::A, &top).unwrap_err();

        match err {
            AnalysisError::MalformedRow(malformed) => {
                assert_eq!(malformed.position, 2);
                assert_eq!(malformed.side, Side::A);
                assert!(malformed.reason.starts_with("secondary score NaN at index 2"));
            }
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_label_is_classification_error() {
        let row = row(&["O", "SUB"], source("t", &["i", "a"]), source("m", &["i", "a"]));
        let top = FrequentWords::default();

        let err = segment_row(&row, 0, Side::A, &top).unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Classification { position: 1, ref label, .. } if label == "SUB"
        ));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_raw_cursors_count_advancing_labels() {
        let labels = ["O", "INS", "DEL", "SUB_TREE", "SUB_MS", "CONT_MS", "O"];
        let row = row(
            &labels,
            source("t", &["a", "b", "c", "d"]),
            source("m", &["a", "c", "e", "f", "d"]),
        );

        let (cursors, segments) = walk(&row, Side::A);

        let parsed = classify_labels(&row).unwrap();
        let count = |side| parsed.iter().filter(|l| l.advances(side)).count();
        assert_eq!(cursors.a.raw, count(Side::A));
        assert_eq!(cursors.b.raw, count(Side::B));
        // INS closed by DEL, then SUB_TREE + SUB_MS closed by CONT_MS
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment.b.tokens, vec!["c"]);
        assert_eq!(segments[1].segment.b.tokens, vec!["e", "f"]);
    }
}
