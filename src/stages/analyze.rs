use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{AlignmentRow, AnalyzedSegment, FrequentWords};

use super::segment_row;

/// Result of running the segmenter over every row
#[derive(Debug, Default)]
pub struct AnalysisOutput {
    /// Segments ordered by row, then by emission within the row
    pub segments: Vec<AnalyzedSegment>,
    /// Rows walked successfully
    pub rows_processed: usize,
    /// Malformed rows dropped in lenient mode
    pub rows_skipped: usize,
}

/// Segment and summarize every row.
///
/// Rows are independent and walked in parallel; outcomes are folded back in
/// row order. Malformed rows are skipped unless `config.strict` is set.
/// Classification errors always abort.
pub fn execute_analysis(
    rows: &[AlignmentRow],
    top_n: &FrequentWords,
    config: &AnalysisConfig,
) -> AnalysisResult<AnalysisOutput> {
    info!(
        "Segmenting {} rows (reference side {}, strict={})",
        rows.len(),
        config.reference_side,
        config.strict
    );

    let outcomes: Vec<AnalysisResult<Vec<AnalyzedSegment>>> = rows
        .par_iter()
        .enumerate()
        .map(|(index, row)| segment_row(row, index, config.reference_side, top_n))
        .collect();

    let mut output = AnalysisOutput::default();
    for outcome in outcomes {
        match outcome {
            Ok(segments) => {
                output.rows_processed += 1;
                output.segments.extend(segments);
            }
            Err(e) if e.is_recoverable() && !config.strict => {
                warn!("Skipping {}", e);
                if let AnalysisError::MalformedRow(malformed) = &e {
                    warn!("{}", malformed.diagnostics());
                }
                output.rows_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Error segments found: {} ({} rows skipped)",
        output.segments.len(),
        output.rows_skipped
    );

    Ok(output)
}
