//! Descriptive statistics over numeric columns.
//!
//! Every statistic skips missing cells. A column with no observations reports
//! `None` for every derived value; a single observation has no sample standard
//! deviation. Percentiles use linear interpolation between order statistics:
//! for sorted values `x[0..n]` and fraction `p`, the rank is `p * (n - 1)` and
//! the result interpolates between the two neighbouring order statistics.

use serde::Serialize;

use crate::{
    dataset::Dataset,
    error::{AnalysisError, AnalysisResult},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryAccumulator {
    values: Vec<f64>,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
        self.values.push(value);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f64)
        }
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let squares = self
            .values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>();
        Some((squares / (self.values.len() as f64 - 1.0)).sqrt())
    }

    pub fn finish(self, column: impl Into<String>) -> ColumnSummary {
        let mean = self.mean();
        let std_dev = self.std_dev();
        let mut sorted = self.values;
        sorted.sort_by(f64::total_cmp);
        ColumnSummary {
            column: column.into(),
            count: sorted.len(),
            mean,
            std_dev,
            min: self.min,
            p25: percentile(&sorted, 0.25),
            median: percentile(&sorted, 0.5),
            p75: percentile(&sorted, 0.75),
            max: self.max,
        }
    }
}

/// Linear-interpolation percentile over ascending `sorted`; `p` in [0, 1].
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn summarize(column: &str, values: &[Option<f64>]) -> ColumnSummary {
    let mut accumulator = SummaryAccumulator::new();
    for value in values.iter().flatten() {
        accumulator.add(*value);
    }
    accumulator.finish(column)
}

/// Quantile of the non-missing values of a column view.
pub fn quantile(values: &[Option<f64>], p: f64) -> Option<f64> {
    let mut sorted = values.iter().flatten().copied().collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);
    percentile(&sorted, p)
}

pub fn describe(dataset: &Dataset, columns: &[String]) -> AnalysisResult<Vec<ColumnSummary>> {
    columns
        .iter()
        .map(|name| {
            let values = dataset.numeric_column(name)?;
            Ok(summarize(name, &values))
        })
        .collect()
}

/// Summaries for every numeric column, in schema order.
pub fn describe_numeric(dataset: &Dataset) -> AnalysisResult<Vec<ColumnSummary>> {
    describe(dataset, &dataset.schema().numeric_columns())
}

pub fn missing_values(dataset: &Dataset) -> Vec<MissingCount> {
    dataset
        .missing_counts()
        .into_iter()
        .map(|(column, missing)| MissingCount { column, missing })
        .collect()
}

/// Equal-width bins spanning [min, max]. Each bin is half-open except the
/// last, which also holds the maximum.
pub fn histogram(values: &[Option<f64>], bins: usize) -> Vec<HistogramBin> {
    let observed = values.iter().flatten().copied().collect::<Vec<_>>();
    if bins == 0 || observed.is_empty() {
        return Vec::new();
    }
    let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: observed.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in observed {
        let slot = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            lower: min + width * idx as f64,
            upper: if idx + 1 == bins {
                max
            } else {
                min + width * (idx + 1) as f64
            },
            count,
        })
        .collect()
}

/// Rows whose `column` value is strictly above its `p` quantile. Rows missing
/// the column are dropped. An empty column yields an empty dataset.
pub fn rows_above_quantile(dataset: &Dataset, column: &str, p: f64) -> AnalysisResult<Dataset> {
    let values = dataset.numeric_column(column)?;
    let idx = dataset
        .schema()
        .column_index(column)
        .ok_or_else(|| AnalysisError::MissingColumn {
            column: column.to_string(),
        })?;
    let Some(cutoff) = quantile(&values, p) else {
        return Ok(dataset.filter_rows(|_| false));
    };
    Ok(dataset.filter_rows(|row| {
        row[idx]
            .as_ref()
            .and_then(|value| value.as_f64())
            .is_some_and(|value| value > cutoff)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Value,
        schema::{ColumnMeta, ColumnType, Schema},
    };

    fn close(left: Option<f64>, right: f64) -> bool {
        left.is_some_and(|value| (value - right).abs() < 1e-9)
    }

    #[test]
    fn summarize_matches_reference_values() {
        let values = [Some(4.0), None, Some(6.0), Some(8.0), Some(9.0)];
        let summary = summarize("Sleep_Hours", &values);
        assert_eq!(summary.count, 4);
        assert!(close(summary.mean, 6.75));
        assert!(close(summary.std_dev, 2.217355782608345));
        assert_eq!(summary.min, Some(4.0));
        assert_eq!(summary.max, Some(9.0));
        assert!(close(summary.p25, 5.5));
        assert!(close(summary.median, 7.0));
        assert!(close(summary.p75, 8.25));
    }

    #[test]
    fn empty_column_reports_undefined_statistics() {
        let summary = summarize("HRV", &[None, None]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.min, None);
        assert_eq!(summary.median, None);
        assert_eq!(summary.max, None);
    }

    #[test]
    fn single_observation_has_no_sample_deviation() {
        let summary = summarize("HRV", &[Some(55.0)]);
        assert_eq!(summary.mean, Some(55.0));
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.p25, Some(55.0));
        assert_eq!(summary.p75, Some(55.0));
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 1.0), Some(4.0));
        assert!(close(percentile(&sorted, 0.5), 2.5));
        assert!(close(percentile(&sorted, 0.25), 1.75));
        assert_eq!(percentile(&sorted, 1.5), None);
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn histogram_places_maximum_in_last_bin() {
        let values = [Some(0.0), Some(2.5), Some(5.0), Some(10.0), None];
        let bins = histogram(&values, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(
            bins.iter().map(|b| b.count).collect::<Vec<_>>(),
            vec![1, 1, 1, 1]
        );
        assert_eq!(bins[3].upper, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
    }

    #[test]
    fn histogram_of_constant_values_is_one_bin() {
        let bins = histogram(&[Some(3.0), Some(3.0)], 30);
        assert_eq!(
            bins,
            vec![HistogramBin {
                lower: 3.0,
                upper: 3.0,
                count: 2
            }]
        );
        assert!(histogram(&[None], 30).is_empty());
    }

    #[test]
    fn rows_above_quantile_keeps_strictly_greater_rows() {
        let schema = Schema::new(vec![ColumnMeta::new("Performance_Score", ColumnType::Float)])
            .unwrap();
        let rows = [40.0, 55.0, 80.0, 85.0]
            .into_iter()
            .map(|v| vec![Some(Value::Float(v))])
            .chain(std::iter::once(vec![None]))
            .collect();
        let dataset = Dataset::new(schema, rows).unwrap();
        let top = rows_above_quantile(&dataset, "Performance_Score", 0.75).unwrap();
        // p75 of [40, 55, 80, 85] is 81.25
        assert_eq!(
            top.numeric_column("Performance_Score").unwrap(),
            vec![Some(85.0)]
        );
    }
}
