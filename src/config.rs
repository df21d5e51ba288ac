use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::Side;

/// Run configuration for error analysis
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Which side's error labels open segments
    pub reference_side: Side,
    /// Precomputed top-N frequent-word table (TSV)
    pub top_n_path: PathBuf,
    /// Abort on the first malformed row instead of skipping it
    pub strict: bool,
    /// Verbose logging only; no effect on results
    pub debug: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_side: Side::A,
            top_n_path: PathBuf::from("data/top-n.tsv"),
            strict: false,
            debug: false,
        }
    }
}

/// Values given explicitly on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub reference_side: Option<Side>,
    pub top_n_path: Option<PathBuf>,
    pub strict: Option<bool>,
    pub debug: Option<bool>,
}

impl AnalysisConfig {
    /// Load config from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(side) = overrides.reference_side {
            self.reference_side = side;
        }
        if let Some(path) = overrides.top_n_path {
            self.top_n_path = path;
        }
        if let Some(strict) = overrides.strict {
            self.strict = strict;
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }
        self
    }
}
