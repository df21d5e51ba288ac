use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use errseg::models::{count_top_words, Side};
use errseg::{
    execute_analysis, load_top_n, parse_rows_file, write_records, write_top_n, AnalysisConfig,
    ConfigOverrides, OutputFormat, RunReport, SegmentRecord,
};

#[derive(Parser)]
#[command(name = "errseg")]
#[command(author, version, about = "Error segmentation over reconciled token alignments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract error segments and their surprisal statistics
    Analyze {
        /// Alignment rows (JSON Lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for segment records
        #[arg(short, long)]
        output: PathBuf,

        /// JSON config file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Side whose error labels open segments (a or b)
        #[arg(long)]
        reference_side: Option<Side>,

        /// Top-N frequent-word table (TSV)
        #[arg(long)]
        top_n: Option<PathBuf>,

        /// Abort on the first malformed row (`--strict false` overrides the config file)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        strict: Option<bool>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
        format: OutputFormat,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Verbose output (`--verbose false` overrides the config file)
        #[arg(short, long, num_args = 0..=1, default_missing_value = "true")]
        verbose: Option<bool>,
    },

    /// Build the top-N frequent-word table from A-side tokens
    TopN {
        /// Alignment rows (JSON Lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Output TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Number of words to keep
        #[arg(short = 'n', long, default_value = "200")]
        count: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check column lengths of every row against its identity markers
    Verify {
        /// Alignment rows (JSON Lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            reference_side,
            top_n,
            strict,
            format,
            report,
            verbose,
        } => {
            let config = match config {
                Some(path) => AnalysisConfig::from_file(&path)?,
                None => AnalysisConfig::default(),
            }
            .with_overrides(ConfigOverrides {
                reference_side,
                top_n_path: top_n,
                strict,
                debug: verbose,
            });

            setup_logging(config.debug);
            analyze(input, output, &config, format, report)
        }
        Commands::TopN {
            input,
            output,
            count,
            verbose,
        } => {
            setup_logging(verbose);
            build_top_n(input, output, count)
        }
        Commands::Verify { input, verbose } => {
            setup_logging(verbose);
            verify(input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn analyze(
    input: PathBuf,
    output: PathBuf,
    config: &AnalysisConfig,
    format: OutputFormat,
    report: Option<PathBuf>,
) -> Result<()> {
    // the frequent-word table must exist before any row is touched
    info!("Loading top-N words from {:?}", config.top_n_path);
    let top_n = load_top_n(&config.top_n_path).context("Cannot start analysis")?;
    debug!("{} frequent words loaded", top_n.len());

    info!("Loading alignments from {:?}", input);
    let rows = parse_rows_file(&input).context("Failed to parse alignment rows")?;
    info!("Loaded {} rows", rows.len());

    let result = execute_analysis(&rows, &top_n, config)?;

    let records: Vec<SegmentRecord> = result
        .segments
        .iter()
        .map(SegmentRecord::from_segment)
        .collect();
    info!("Writing {} records to {:?}", records.len(), output);
    write_records(&output, &records, format)?;

    if let Some(path) = report {
        let run = RunReport::new(
            rows.len(),
            result.rows_skipped,
            records.len(),
            config.reference_side,
            config.strict,
        );
        run.write_json(&path)?;
        info!("Run report written to {:?}", path);
    }

    Ok(())
}

fn build_top_n(input: PathBuf, output: PathBuf, count: usize) -> Result<()> {
    info!("Counting words in {:?}", input);
    let rows = parse_rows_file(&input).context("Failed to parse alignment rows")?;
    let words = count_top_words(&rows, count);

    info!("Writing top {} ({} found) to {:?}", count, words.len(), output);
    write_top_n(&output, &words)
}

fn verify(input: PathBuf) -> Result<()> {
    let rows = parse_rows_file(&input).context("Failed to parse alignment rows")?;

    let mut flagged = 0;
    for row in &rows {
        let mismatches = row.verify();
        if mismatches.is_empty() {
            continue;
        }
        flagged += 1;
        for m in mismatches {
            warn!(
                "Length mismatch in {}: {} has {} entries, expected {}",
                row.id, m.field, m.actual, m.expected
            );
        }
    }

    info!("Verified {} rows, {} with length mismatches", rows.len(), flagged);
    Ok(())
}
