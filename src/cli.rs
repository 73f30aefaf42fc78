use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::group::Aggregate;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Summarise athlete training, recovery, and performance data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full analysis: statistics, correlations, insights, buckets, and group tables
    Report(ReportArgs),
    /// Descriptive statistics and missing-value counts for any CSV (athlete columns not required)
    Describe(DescribeArgs),
    /// Pairwise correlation matrix across the numeric columns of any CSV
    Correlate(DescribeArgs),
    /// Evaluate the insight rules against the correlation matrix
    Insights(ReportArgs),
    /// Bucket a numeric column and count rows per label
    Bucket(BucketArgs),
    /// Aggregate a numeric column per category
    Group(GroupArgs),
    /// Print the inferred schema as YAML
    Schema(InputArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV file (`-` for stdin, which requires --schema)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Schema YAML declaring column types (inferred when omitted)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Analysis configuration YAML (thresholds, bucket boundaries, top-N)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Output format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct BucketArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Numeric column to bucket
    #[arg(short = 'C', long)]
    pub column: String,
    /// Strictly increasing breakpoints, e.g. `0,33,66,100`
    #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    pub breakpoints: Vec<f64>,
    /// One label per interval, e.g. `Low,Moderate,High`
    #[arg(long, value_delimiter = ',', required = true)]
    pub labels: Vec<String>,
    /// Output format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Categorical column to group by
    #[arg(long = "by")]
    pub group_by: String,
    /// Numeric column to aggregate
    #[arg(long)]
    pub target: String,
    /// Aggregate function (mean, median, sum, count, min, max)
    #[arg(long, default_value = "mean")]
    pub aggregate: Aggregate,
    /// Keep only the top N groups
    #[arg(long)]
    pub top: Option<usize>,
    /// Output format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
