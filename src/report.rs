//! End-to-end analysis over one dataset.
//!
//! [`Pipeline::new`] validates configuration before any data is touched;
//! [`Pipeline::run`] checks the schema and then computes every section of the
//! [`AnalysisReport`]. Each stage reads the input dataset and allocates its own
//! output; nothing is mutated in place.

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    bucket::{BucketAssignment, BucketCount, Bucketizer, bucketize},
    config::AnalysisConfig,
    correlation::{CorrelationMatrix, numeric_correlation_matrix},
    dataset::Dataset,
    error::AnalysisResult,
    group::{Aggregate, GroupDistribution, GroupTable, group_aggregate, group_distributions},
    insights::{Insight, InsightRule, evaluate_rules},
    schema::{
        ColumnKind, GENDER, KEY_METRICS, PERCEIVED_STRESS, PERFORMANCE_SCORE, REQUIRED_COLUMNS,
        RequiredColumn, SPORT, TRAINING_HOURS,
    },
    stats::{
        ColumnSummary, HistogramBin, MissingCount, describe, describe_numeric, histogram,
        missing_values, quantile, rows_above_quantile,
    },
    table::{Table, format_number, format_optional},
};

const HEAD_ROWS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnOverview {
    pub name: String,
    pub datatype: String,
    pub non_missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub columns: Vec<ColumnOverview>,
    pub head: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    pub assignment: BucketAssignment,
    pub counts: Vec<BucketCount>,
    pub unassigned: usize,
}

impl BucketSummary {
    pub fn from_assignment(assignment: BucketAssignment) -> Self {
        let (counts, unassigned) = assignment.counts();
        Self {
            assignment,
            counts,
            unassigned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsetSummary {
    pub rows: usize,
    pub statistics: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPerformers {
    pub quantile: f64,
    pub cutoff: Option<f64>,
    pub rows: usize,
    pub statistics: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub overview: DatasetOverview,
    pub missing_values: Vec<MissingCount>,
    pub statistics: Vec<ColumnSummary>,
    pub correlation: CorrelationMatrix,
    pub insights: Vec<Insight>,
    pub performance_histogram: Vec<HistogramBin>,
    pub key_metrics: SubsetSummary,
    pub risk_levels: BucketSummary,
    pub sleep_buckets: BucketSummary,
    pub training_by_gender: GroupTable,
    pub top_sports: GroupTable,
    pub stress_by_gender: Vec<GroupDistribution>,
    pub performance_by_sport: Vec<GroupDistribution>,
    pub performance_by_sleep: Vec<GroupDistribution>,
    pub top_performers: TopPerformers,
    /// Input rows with the risk level and sleep bucket columns appended.
    #[serde(skip)]
    pub enriched: Dataset,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
    rules: Vec<InsightRule>,
    risk: Bucketizer,
    sleep: Bucketizer,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config
            .validate()
            .context("Invalid analysis configuration")?;
        let (risk, sleep) = config.bucketizers()?;
        let rules = config.rules();
        Ok(Self {
            config,
            rules,
            risk,
            sleep,
        })
    }

    pub fn rules(&self) -> &[InsightRule] {
        &self.rules
    }

    /// Columns the run depends on, including the configured bucket sources.
    pub fn required_columns(&self) -> Vec<RequiredColumn<'_>> {
        let mut required = REQUIRED_COLUMNS.to_vec();
        for spec in [&self.config.risk_buckets, &self.config.sleep_buckets] {
            if !required.iter().any(|r| r.name == spec.column) {
                required.push(RequiredColumn {
                    name: &spec.column,
                    kind: ColumnKind::Numeric,
                });
            }
        }
        required
    }

    pub fn validate(&self, dataset: &Dataset) -> AnalysisResult<()> {
        dataset.schema().require(&self.required_columns())
    }

    pub fn correlations(&self, dataset: &Dataset) -> AnalysisResult<CorrelationMatrix> {
        self.validate(dataset)?;
        numeric_correlation_matrix(dataset)
    }

    pub fn insights(&self, dataset: &Dataset) -> AnalysisResult<Vec<Insight>> {
        let matrix = self.correlations(dataset)?;
        Ok(evaluate_rules(&matrix, &self.rules))
    }

    pub fn run(&self, dataset: &Dataset) -> AnalysisResult<AnalysisReport> {
        self.validate(dataset)?;

        let overview = overview(dataset);
        let missing_values = missing_values(dataset);
        let statistics = describe_numeric(dataset)?;
        info!("Summarised {} numeric column(s)", statistics.len());

        let correlation = numeric_correlation_matrix(dataset)?;
        let insights = evaluate_rules(&correlation, &self.rules);
        info!(
            "{} of {} insight rule(s) fired",
            insights.len(),
            self.rules.len()
        );

        let performance = dataset.numeric_column(PERFORMANCE_SCORE)?;
        let performance_histogram = histogram(&performance, self.config.histogram_bins);

        let mut key_columns = KEY_METRICS.to_vec();
        key_columns.push(GENDER);
        let complete = dataset.complete_rows(&key_columns)?;
        let key_metric_names = KEY_METRICS.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let key_metrics = SubsetSummary {
            rows: complete.row_count(),
            statistics: describe(&complete, &key_metric_names)?,
        };

        let (risk_assignment, with_risk) =
            bucketize(dataset, &self.config.risk_buckets, &self.risk)?;
        let (sleep_assignment, enriched) =
            bucketize(&with_risk, &self.config.sleep_buckets, &self.sleep)?;

        let training_by_gender =
            group_aggregate(dataset, GENDER, TRAINING_HOURS, Aggregate::Mean, None)?;
        let top_sports = group_aggregate(
            dataset,
            SPORT,
            PERFORMANCE_SCORE,
            Aggregate::Mean,
            Some(self.config.top_sports),
        )?;
        let stress_by_gender = group_distributions(dataset, GENDER, PERCEIVED_STRESS, None)?;
        let performance_by_sport = group_distributions(dataset, SPORT, PERFORMANCE_SCORE, None)?;
        let performance_by_sleep = group_distributions(
            &enriched,
            &self.config.sleep_buckets.output_column,
            PERFORMANCE_SCORE,
            Some(self.sleep.labels()),
        )?;

        let quantile_p = self.config.top_performer_quantile;
        let top = rows_above_quantile(dataset, PERFORMANCE_SCORE, quantile_p)?;
        let top_performers = TopPerformers {
            quantile: quantile_p,
            cutoff: quantile(&performance, quantile_p),
            rows: top.row_count(),
            statistics: describe_numeric(&top)?,
        };

        Ok(AnalysisReport {
            overview,
            missing_values,
            statistics,
            correlation,
            insights,
            performance_histogram,
            key_metrics,
            risk_levels: BucketSummary::from_assignment(risk_assignment),
            sleep_buckets: BucketSummary::from_assignment(sleep_assignment),
            training_by_gender,
            top_sports,
            stress_by_gender,
            performance_by_sport,
            performance_by_sleep,
            top_performers,
            enriched,
        })
    }
}

fn overview(dataset: &Dataset) -> DatasetOverview {
    let missing = dataset.missing_counts();
    let columns = dataset
        .schema()
        .columns
        .iter()
        .zip(missing)
        .map(|(column, (_, missing))| ColumnOverview {
            name: column.name.clone(),
            datatype: column.datatype.to_string(),
            non_missing: dataset.row_count() - missing,
        })
        .collect();
    let head = dataset
        .head(HEAD_ROWS)
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_ref().map(|v| v.as_display()))
                .collect()
        })
        .collect();
    DatasetOverview {
        rows: dataset.row_count(),
        columns,
        head,
    }
}

pub fn statistics_table(statistics: &[ColumnSummary]) -> Table {
    let mut table = Table::new([
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
    ]);
    for summary in statistics {
        table.push_row(vec![
            summary.column.clone(),
            summary.count.to_string(),
            format_optional(summary.mean),
            format_optional(summary.std_dev),
            format_optional(summary.min),
            format_optional(summary.p25),
            format_optional(summary.median),
            format_optional(summary.p75),
            format_optional(summary.max),
        ]);
    }
    table
}

pub fn missing_table(missing: &[MissingCount]) -> Table {
    let mut table = Table::new(["column", "missing"]);
    for entry in missing {
        table.push_row(vec![entry.column.clone(), entry.missing.to_string()]);
    }
    table
}

pub fn correlation_table(matrix: &CorrelationMatrix) -> Table {
    let mut headers = vec![String::new()];
    headers.extend(matrix.columns().iter().cloned());
    let mut table = Table::new(headers);
    for (name, coefficients) in matrix.rows() {
        let mut row = vec![name.to_string()];
        row.extend(
            coefficients
                .iter()
                .map(|c| c.value().map(|v| format!("{v:.2}")).unwrap_or_else(|| "undefined".into())),
        );
        table.push_row(row);
    }
    table
}

pub fn group_table(group: &GroupTable) -> Table {
    let mut table = Table::new([
        group.group_by.clone(),
        format!("{}({})", group.aggregate, group.target),
        "n".to_string(),
    ]);
    for row in &group.rows {
        table.push_row(vec![
            row.key.clone(),
            format_number(row.value),
            row.count.to_string(),
        ]);
    }
    table
}

pub fn distribution_table(label: &str, groups: &[GroupDistribution]) -> Table {
    let mut table = Table::new([label, "count", "min", "25%", "50%", "75%", "max", "mean"]);
    for group in groups {
        let s = &group.summary;
        table.push_row(vec![
            group.key.clone(),
            s.count.to_string(),
            format_optional(s.min),
            format_optional(s.p25),
            format_optional(s.median),
            format_optional(s.p75),
            format_optional(s.max),
            format_optional(s.mean),
        ]);
    }
    table
}

pub fn bucket_table(summary: &BucketSummary) -> Table {
    let mut table = Table::new(["label", "count"]);
    for count in &summary.counts {
        table.push_row(vec![count.label.clone(), count.count.to_string()]);
    }
    table.push_row(vec!["unassigned".to_string(), summary.unassigned.to_string()]);
    table
}

pub fn insight_lines(insights: &[Insight]) -> String {
    if insights.is_empty() {
        return "No insight thresholds were crossed.\n".to_string();
    }
    insights
        .iter()
        .map(|insight| format!("{insight}\n"))
        .collect()
}

fn section(output: &mut String, title: &str, body: &str) {
    output.push_str(&format!("\n--- {title} ---\n"));
    output.push_str(body);
}

/// Human-readable rendering of every report section.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut output = String::new();

    let mut info = Table::new(["column", "type", "non-missing"]);
    for column in &report.overview.columns {
        info.push_row(vec![
            column.name.clone(),
            column.datatype.clone(),
            column.non_missing.to_string(),
        ]);
    }
    section(
        &mut output,
        &format!("Dataset Info ({} rows)", report.overview.rows),
        &info.render(),
    );

    let mut head = Table::new(report.overview.columns.iter().map(|c| c.name.clone()));
    for row in &report.overview.head {
        head.push_row(
            row.iter()
                .map(|cell| cell.clone().unwrap_or_else(|| "NA".to_string()))
                .collect(),
        );
    }
    section(&mut output, "First 5 Rows", &head.render());

    section(&mut output, "Missing Values", &missing_table(&report.missing_values).render());
    section(
        &mut output,
        "Descriptive Statistics",
        &statistics_table(&report.statistics).render(),
    );
    section(
        &mut output,
        "Correlation Matrix",
        &correlation_table(&report.correlation).render(),
    );
    section(&mut output, "Actionable Insights", &insight_lines(&report.insights));

    let mut bins = Table::new(["lower", "upper", "count"]);
    for bin in &report.performance_histogram {
        bins.push_row(vec![
            format_number(bin.lower),
            format_number(bin.upper),
            bin.count.to_string(),
        ]);
    }
    section(&mut output, "Performance Score Distribution", &bins.render());

    section(
        &mut output,
        "Average Training Hours per Gender",
        &group_table(&report.training_by_gender).render(),
    );
    section(
        &mut output,
        "Top Performing Sports by Average Score",
        &group_table(&report.top_sports).render(),
    );
    section(
        &mut output,
        &format!("Key Metrics (complete rows: {})", report.key_metrics.rows),
        &statistics_table(&report.key_metrics.statistics).render(),
    );
    section(
        &mut output,
        "Perceived Stress Score by Gender",
        &distribution_table(GENDER, &report.stress_by_gender).render(),
    );
    section(
        &mut output,
        "Performance Score by Sport",
        &distribution_table(SPORT, &report.performance_by_sport).render(),
    );
    section(
        &mut output,
        "Injury Risk Distribution",
        &bucket_table(&report.risk_levels).render(),
    );
    section(
        &mut output,
        "Sleep Duration Distribution",
        &bucket_table(&report.sleep_buckets).render(),
    );
    section(
        &mut output,
        &format!(
            "Average Stats of Top Performers ({} rows above {})",
            report.top_performers.rows,
            format_optional(report.top_performers.cutoff)
        ),
        &statistics_table(&report.top_performers.statistics).render(),
    );
    section(
        &mut output,
        "Performance by Sleep Duration",
        &distribution_table("Sleep_Bucket", &report.performance_by_sleep).render(),
    );
    output
}
