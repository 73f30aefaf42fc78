//! Ordinal bucketing of continuous values.
//!
//! `N + 1` strictly increasing breakpoints define `N` intervals
//! `(b[i], b[i + 1]]`; the first interval also includes `b[0]`. Values outside
//! `[b[0], b[N]]` and missing values are [`BucketLabel::Unassigned`].

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    data::Value,
    dataset::Dataset,
    error::{AnalysisError, AnalysisResult},
    schema::ColumnType,
};

pub const RISK_BREAKPOINTS: [f64; 4] = [0.0, 33.0, 66.0, 100.0];
pub const RISK_LABELS: [&str; 3] = ["Low Risk", "Moderate Risk", "High Risk"];
pub const SLEEP_BREAKPOINTS: [f64; 5] = [0.0, 5.0, 7.0, 9.0, 12.0];
pub const SLEEP_LABELS: [&str; 4] = ["<5", "5-7", "7-9", "9+"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketLabel {
    Assigned { index: usize, label: String },
    Unassigned,
}

impl BucketLabel {
    pub fn label(&self) -> Option<&str> {
        match self {
            BucketLabel::Assigned { label, .. } => Some(label),
            BucketLabel::Unassigned => None,
        }
    }
}

impl fmt::Display for BucketLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketLabel::Assigned { label, .. } => write!(f, "{label}"),
            BucketLabel::Unassigned => write!(f, "unassigned"),
        }
    }
}

impl Serialize for BucketLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Breakpoints and labels as they appear in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub column: String,
    pub output_column: String,
    pub breakpoints: Vec<f64>,
    pub labels: Vec<String>,
}

impl BucketSpec {
    pub fn injury_risk() -> Self {
        Self {
            column: crate::schema::INJURY_RISK_SCORE.to_string(),
            output_column: "Injury_Risk_Level".to_string(),
            breakpoints: RISK_BREAKPOINTS.to_vec(),
            labels: RISK_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn sleep_duration() -> Self {
        Self {
            column: crate::schema::SLEEP_HOURS.to_string(),
            output_column: "Sleep_Bucket".to_string(),
            breakpoints: SLEEP_BREAKPOINTS.to_vec(),
            labels: SLEEP_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn build(&self) -> AnalysisResult<Bucketizer> {
        Bucketizer::new(self.breakpoints.clone(), self.labels.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucketizer {
    breakpoints: Vec<f64>,
    labels: Vec<String>,
}

impl Bucketizer {
    pub fn new(breakpoints: Vec<f64>, labels: Vec<String>) -> AnalysisResult<Self> {
        if breakpoints.len() < 2 {
            return Err(AnalysisError::TooFewBreakpoints(breakpoints.len()));
        }
        if let Some(index) = breakpoints.iter().position(|b| !b.is_finite()) {
            return Err(AnalysisError::NonFiniteBreakpoint { index });
        }
        for (index, pair) in breakpoints.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(AnalysisError::NonIncreasingBreakpoints {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
        let intervals = breakpoints.len() - 1;
        if labels.len() != intervals {
            return Err(AnalysisError::LabelCountMismatch {
                labels: labels.len(),
                intervals,
            });
        }
        Ok(Self {
            breakpoints,
            labels,
        })
    }

    pub fn injury_risk() -> Self {
        Self {
            breakpoints: RISK_BREAKPOINTS.to_vec(),
            labels: RISK_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn sleep_duration() -> Self {
        Self {
            breakpoints: SLEEP_BREAKPOINTS.to_vec(),
            labels: SLEEP_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of the interval holding `value`, if any.
    pub fn interval_of(&self, value: f64) -> Option<usize> {
        let first = self.breakpoints[0];
        let last = self.breakpoints[self.breakpoints.len() - 1];
        if value.is_nan() || value < first || value > last {
            return None;
        }
        if value == first {
            return Some(0);
        }
        // first upper bound that is >= value
        let upper = self.breakpoints.partition_point(|b| *b < value);
        Some(upper - 1)
    }

    pub fn classify(&self, value: Option<f64>) -> BucketLabel {
        match value.and_then(|v| self.interval_of(v)) {
            Some(index) => BucketLabel::Assigned {
                index,
                label: self.labels[index].clone(),
            },
            None => BucketLabel::Unassigned,
        }
    }

    /// Labels for a whole column view. Present values outside the breakpoint
    /// range are logged; missing values are not.
    pub fn assign(&self, column: &str, values: &[Option<f64>]) -> BucketAssignment {
        let labels = values
            .iter()
            .enumerate()
            .map(|(row, value)| {
                let label = self.classify(*value);
                if let (BucketLabel::Unassigned, Some(v)) = (&label, value) {
                    warn!(
                        "Row {}: {} value {} is outside [{}, {}]; left unassigned",
                        row + 1,
                        column,
                        v,
                        self.breakpoints[0],
                        self.breakpoints[self.breakpoints.len() - 1]
                    );
                }
                label
            })
            .collect();
        BucketAssignment {
            column: column.to_string(),
            order: self.labels.clone(),
            labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketAssignment {
    pub column: String,
    pub order: Vec<String>,
    pub labels: Vec<BucketLabel>,
}

impl BucketAssignment {
    /// Row count per label in label order, followed by the unassigned count.
    pub fn counts(&self) -> (Vec<BucketCount>, usize) {
        let mut counts = vec![0usize; self.order.len()];
        let mut unassigned = 0usize;
        for label in &self.labels {
            match label {
                BucketLabel::Assigned { index, .. } => counts[*index] += 1,
                BucketLabel::Unassigned => unassigned += 1,
            }
        }
        let counts = self
            .order
            .iter()
            .zip(counts)
            .map(|(label, count)| BucketCount {
                label: label.clone(),
                count,
            })
            .collect();
        (counts, unassigned)
    }

    /// Cells for merging back onto the dataset; unassigned rows become missing.
    pub fn to_values(&self) -> Vec<Option<Value>> {
        self.labels
            .iter()
            .map(|label| label.label().map(|l| Value::String(l.to_string())))
            .collect()
    }
}

/// Classifies `spec.column` and returns the assignment together with a new
/// dataset carrying it as `spec.output_column`.
pub fn bucketize(
    dataset: &Dataset,
    spec: &BucketSpec,
    bucketizer: &Bucketizer,
) -> AnalysisResult<(BucketAssignment, Dataset)> {
    let values = dataset.numeric_column(&spec.column)?;
    let assignment = bucketizer.assign(&spec.column, &values);
    let merged = dataset.with_column(
        &spec.output_column,
        ColumnType::String,
        assignment.to_values(),
    )?;
    Ok((assignment, merged))
}
