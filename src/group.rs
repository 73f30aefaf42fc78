//! Per-category aggregates of a numeric column.
//!
//! Rows missing either the grouping key or the target value are skipped and
//! never form a partition. Tables are ranked by aggregate value, highest
//! first; equal values keep the order in which their keys first appeared.

use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::Dataset,
    error::AnalysisResult,
    stats::{ColumnSummary, SummaryAccumulator, percentile},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Mean,
    Median,
    Sum,
    Count,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Median => "median",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }

    /// Applies the aggregate to a non-empty partition.
    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                percentile(&sorted, 0.5).unwrap_or(f64::NAN)
            }
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Count => values.len() as f64,
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Aggregate {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Aggregate::Mean),
            "median" => Ok(Aggregate::Median),
            "sum" => Ok(Aggregate::Sum),
            "count" => Ok(Aggregate::Count),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            other => Err(anyhow!(
                "Unknown aggregate '{other}'. Supported: mean, median, sum, count, min, max"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: String,
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTable {
    pub group_by: String,
    pub target: String,
    pub aggregate: Aggregate,
    pub rows: Vec<GroupRow>,
}

impl GroupTable {
    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.rows
            .iter()
            .map(|row| (row.key.as_str(), row.value))
            .collect()
    }
}

/// Partitions `(key, value)` pairs, keeping partitions in first-seen key order.
fn partition(keys: &[Option<String>], values: &[Option<f64>]) -> Vec<(String, Vec<f64>)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut partitions: Vec<(String, Vec<f64>)> = Vec::new();
    for (key, value) in keys.iter().zip(values) {
        let (Some(key), Some(value)) = (key, value) else {
            continue;
        };
        match positions.get(key.as_str()) {
            Some(&slot) => partitions[slot].1.push(*value),
            None => {
                positions.insert(key.as_str(), partitions.len());
                partitions.push((key.clone(), vec![*value]));
            }
        }
    }
    partitions
}

/// Ranks groups of `values` keyed by `keys`; `top` truncates to at most that
/// many rows.
pub fn aggregate_groups(
    keys: &[Option<String>],
    values: &[Option<f64>],
    aggregate: Aggregate,
    top: Option<usize>,
) -> Vec<GroupRow> {
    let mut rows = partition(keys, values)
        .into_iter()
        .map(|(key, members)| GroupRow {
            value: aggregate.apply(&members),
            count: members.len(),
            key,
        })
        .collect::<Vec<_>>();
    // stable: ties keep first-seen order
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    if let Some(limit) = top {
        rows.truncate(limit);
    }
    rows
}

pub fn group_aggregate(
    dataset: &Dataset,
    group_by: &str,
    target: &str,
    aggregate: Aggregate,
    top: Option<usize>,
) -> AnalysisResult<GroupTable> {
    let keys = dataset.categorical_column(group_by)?;
    let values = dataset.numeric_column(target)?;
    Ok(GroupTable {
        group_by: group_by.to_string(),
        target: target.to_string(),
        aggregate,
        rows: aggregate_groups(&keys, &values, aggregate, top),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub key: String,
    pub summary: ColumnSummary,
}

/// Distribution summary of `target` per group, groups in first-seen order
/// unless `order` lists the keys explicitly. Keys absent from the data are
/// skipped.
pub fn group_distributions(
    dataset: &Dataset,
    group_by: &str,
    target: &str,
    order: Option<&[String]>,
) -> AnalysisResult<Vec<GroupDistribution>> {
    let keys = dataset.categorical_column(group_by)?;
    let values = dataset.numeric_column(target)?;
    let mut partitions = partition(&keys, &values);
    if let Some(order) = order {
        partitions.sort_by_key(|(key, _)| {
            order
                .iter()
                .position(|candidate| candidate == key)
                .unwrap_or(order.len())
        });
    }
    Ok(partitions
        .into_iter()
        .map(|(key, members)| {
            let mut accumulator = SummaryAccumulator::new();
            for value in members {
                accumulator.add(value);
            }
            GroupDistribution {
                summary: accumulator.finish(target),
                key,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Value,
        schema::{ColumnMeta, ColumnType, Schema},
    };

    fn keys(raw: &[Option<&str>]) -> Vec<Option<String>> {
        raw.iter().map(|k| k.map(str::to_string)).collect()
    }

    #[test]
    fn gender_mean_training_hours() {
        let schema = Schema::new(vec![
            ColumnMeta::new("Gender", ColumnType::String),
            ColumnMeta::new("Training_Hours_per_Week", ColumnType::Float),
        ])
        .unwrap();
        let rows = [("M", 10.0), ("M", 12.0), ("F", 8.0)]
            .into_iter()
            .map(|(g, h)| vec![Some(Value::String(g.into())), Some(Value::Float(h))])
            .collect();
        let dataset = Dataset::new(schema, rows).unwrap();
        let table = group_aggregate(
            &dataset,
            "Gender",
            "Training_Hours_per_Week",
            Aggregate::Mean,
            None,
        )
        .unwrap();
        assert_eq!(table.pairs(), vec![("M", 11.0), ("F", 8.0)]);
        assert_eq!(table.rows[0].count, 2);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let rows = aggregate_groups(
            &keys(&[Some("Rowing"), Some("Judo"), Some("Tennis"), Some("Judo")]),
            &[Some(70.0), Some(80.0), Some(80.0), Some(80.0)],
            Aggregate::Mean,
            None,
        );
        let order = rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["Judo", "Tennis", "Rowing"]);
    }

    #[test]
    fn missing_keys_and_targets_form_no_partition() {
        let rows = aggregate_groups(
            &keys(&[Some("M"), None, Some("F"), Some("X")]),
            &[Some(10.0), Some(99.0), Some(8.0), None],
            Aggregate::Mean,
            None,
        );
        assert_eq!(
            rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(),
            vec!["M", "F"]
        );
    }

    #[test]
    fn top_n_truncates_to_available_groups() {
        let keys = keys(&[Some("a"), Some("b"), Some("c")]);
        let values = [Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(aggregate_groups(&keys, &values, Aggregate::Mean, Some(2)).len(), 2);
        assert_eq!(aggregate_groups(&keys, &values, Aggregate::Mean, Some(5)).len(), 3);
        assert!(aggregate_groups(&keys, &values, Aggregate::Mean, Some(0)).is_empty());
    }

    #[test]
    fn other_aggregates() {
        let keys = keys(&[Some("a"), Some("a"), Some("a"), Some("b")]);
        let values = [Some(1.0), Some(5.0), Some(3.0), Some(2.0)];
        let value_of = |agg: Aggregate| {
            aggregate_groups(&keys, &values, agg, None)
                .into_iter()
                .find(|row| row.key == "a")
                .map(|row| row.value)
                .unwrap()
        };
        assert_eq!(value_of(Aggregate::Median), 3.0);
        assert_eq!(value_of(Aggregate::Sum), 9.0);
        assert_eq!(value_of(Aggregate::Count), 3.0);
        assert_eq!(value_of(Aggregate::Min), 1.0);
        assert_eq!(value_of(Aggregate::Max), 5.0);
        assert_eq!("AVG".parse::<Aggregate>().unwrap(), Aggregate::Mean);
        assert!("mode".parse::<Aggregate>().is_err());
    }

    #[test]
    fn distributions_respect_explicit_order() {
        let schema = Schema::new(vec![
            ColumnMeta::new("Sleep_Bucket", ColumnType::String),
            ColumnMeta::new("Performance_Score", ColumnType::Float),
        ])
        .unwrap();
        let rows = [("7-9", 80.0), ("<5", 40.0), ("7-9", 90.0), ("5-7", 60.0)]
            .into_iter()
            .map(|(k, v)| vec![Some(Value::String(k.into())), Some(Value::Float(v))])
            .collect();
        let dataset = Dataset::new(schema, rows).unwrap();
        let order = ["<5", "5-7", "7-9", "9+"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let groups =
            group_distributions(&dataset, "Sleep_Bucket", "Performance_Score", Some(&order))
                .unwrap();
        assert_eq!(
            groups.iter().map(|g| g.key.as_str()).collect::<Vec<_>>(),
            vec!["<5", "5-7", "7-9"]
        );
        assert_eq!(groups[2].summary.median, Some(85.0));
    }
}
