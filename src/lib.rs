pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod stages;

pub use config::{AnalysisConfig, ConfigOverrides};
pub use error::{AnalysisError, AnalysisResult, MalformedRow};
pub use io::{
    load_top_n, parse_rows_file, parse_rows_jsonl, write_records, write_top_n, OutputFormat,
    RunReport, SegmentRecord,
};
pub use models::{
    AlignmentRow, AnalyzedSegment, ErrorSegment, ErrorType, FrequentWords, Label, Side,
    TokenView,
};
pub use stages::{execute_analysis, segment_row, AnalysisOutput, CursorSet, SegmentBuilder};
