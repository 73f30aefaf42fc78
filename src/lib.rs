pub mod bucket;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod data;
pub mod dataset;
pub mod error;
pub mod group;
pub mod insights;
pub mod io_utils;
pub mod loader;
pub mod report;
pub mod schema;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use serde::Serialize;

use crate::{
    bucket::Bucketizer,
    cli::{BucketArgs, Cli, Commands, DescribeArgs, GroupArgs, InputArgs, OutputFormat, ReportArgs},
    config::AnalysisConfig,
    dataset::Dataset,
    report::Pipeline,
    schema::Schema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("athlete_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Report(args) => handle_report(&args),
        Commands::Describe(args) => handle_describe(&args),
        Commands::Correlate(args) => handle_correlate(&args),
        Commands::Insights(args) => handle_insights(&args),
        Commands::Bucket(args) => handle_bucket(&args),
        Commands::Group(args) => handle_group(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn load_input(args: &InputArgs) -> Result<Dataset> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let schema = match &args.schema {
        Some(path) => {
            Some(Schema::load(path).with_context(|| format!("Loading schema from {path:?}"))?)
        }
        None => None,
    };
    info!(
        "Reading '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    loader::load_dataset(&args.input, schema.as_ref(), delimiter, encoding)
        .with_context(|| format!("Loading dataset from {:?}", args.input))
}

fn load_pipeline(config: Option<&std::path::Path>) -> Result<Pipeline> {
    let config = AnalysisConfig::load_or_default(config)?;
    Pipeline::new(config)
}

fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing output to JSON")?;
    println!("{rendered}");
    Ok(())
}

fn handle_report(args: &ReportArgs) -> Result<()> {
    let pipeline = load_pipeline(args.config.as_deref())?;
    let dataset = load_input(&args.input)?;
    let report = pipeline
        .run(&dataset)
        .with_context(|| format!("Analysing {:?}", args.input.input))?;
    match args.format {
        OutputFormat::Json => emit_json(&report)?,
        OutputFormat::Table => print!("{}", report::render_text(&report)),
    }
    info!(
        "Report complete: {} row(s), {} insight(s)",
        dataset.row_count(),
        report.insights.len()
    );
    Ok(())
}

// describe and correlate accept any CSV, so no athlete column check here.
fn handle_describe(args: &DescribeArgs) -> Result<()> {
    let dataset = load_input(&args.input)?;
    let statistics = stats::describe_numeric(&dataset)?;
    let missing = stats::missing_values(&dataset);
    match args.format {
        OutputFormat::Json => emit_json(&serde_json::json!({
            "statistics": statistics,
            "missing_values": missing,
        }))?,
        OutputFormat::Table => {
            print!("{}", report::statistics_table(&statistics).render());
            println!();
            print!("{}", report::missing_table(&missing).render());
        }
    }
    info!("Computed summary statistics for {} column(s)", statistics.len());
    Ok(())
}

fn handle_correlate(args: &DescribeArgs) -> Result<()> {
    let dataset = load_input(&args.input)?;
    let matrix = correlation::numeric_correlation_matrix(&dataset)?;
    match args.format {
        OutputFormat::Json => emit_json(&matrix)?,
        OutputFormat::Table => print!("{}", report::correlation_table(&matrix).render()),
    }
    info!("Correlated {} numeric column(s)", matrix.columns().len());
    Ok(())
}

fn handle_insights(args: &ReportArgs) -> Result<()> {
    let pipeline = load_pipeline(args.config.as_deref())?;
    let dataset = load_input(&args.input)?;
    let insights = pipeline.insights(&dataset)?;
    match args.format {
        OutputFormat::Json => emit_json(&insights)?,
        OutputFormat::Table => print!("{}", report::insight_lines(&insights)),
    }
    info!(
        "{} of {} insight rule(s) fired",
        insights.len(),
        pipeline.rules().len()
    );
    Ok(())
}

fn handle_bucket(args: &BucketArgs) -> Result<()> {
    let bucketizer = Bucketizer::new(args.breakpoints.clone(), args.labels.clone())
        .with_context(|| format!("Invalid bucket configuration for '{}'", args.column))?;
    let dataset = load_input(&args.input)?;
    let values = dataset.numeric_column(&args.column)?;
    let summary = report::BucketSummary::from_assignment(bucketizer.assign(&args.column, &values));
    match args.format {
        OutputFormat::Json => emit_json(&summary)?,
        OutputFormat::Table => print!("{}", report::bucket_table(&summary).render()),
    }
    Ok(())
}

fn handle_group(args: &GroupArgs) -> Result<()> {
    let dataset = load_input(&args.input)?;
    let table = group::group_aggregate(
        &dataset,
        &args.group_by,
        &args.target,
        args.aggregate,
        args.top,
    )?;
    match args.format {
        OutputFormat::Json => emit_json(&table)?,
        OutputFormat::Table => print!("{}", report::group_table(&table).render()),
    }
    info!(
        "Aggregated '{}' across {} group(s) of '{}'",
        args.target,
        table.rows.len(),
        args.group_by
    );
    Ok(())
}

fn handle_schema(args: &InputArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let schema = schema::infer_schema(&args.input, 0, delimiter, encoding)
        .with_context(|| format!("Inferring schema from {:?}", args.input))?;
    print!("{}", schema.to_yaml_string()?);
    info!("Inferred {} column(s)", schema.columns.len());
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
