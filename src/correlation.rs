//! Pairwise Pearson correlation across numeric columns.
//!
//! Each unordered pair uses only the rows where both columns are present, so
//! different pairs may be computed over different row subsets. A pair with
//! fewer than two such rows, or with a constant column over them, is
//! [`Coefficient::Undefined`]. The diagonal is always exactly 1.0.

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{dataset::Dataset, error::AnalysisResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coefficient {
    Defined(f64),
    Undefined,
}

impl Coefficient {
    pub fn value(&self) -> Option<f64> {
        match self {
            Coefficient::Defined(value) => Some(*value),
            Coefficient::Undefined => None,
        }
    }
}

/// Symmetric matrix stored densely in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    coefficients: Vec<Vec<Coefficient>>,
}

impl CorrelationMatrix {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Coefficient for a pair; `None` when either column is not in the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<Coefficient> {
        let row = self.position(a)?;
        let col = self.position(b)?;
        Some(self.coefficients[row][col])
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Coefficient])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.coefficients.iter().map(Vec::as_slice))
    }

    /// Matrix of the same shape with every off-diagonal entry undefined.
    pub fn undefined(columns: Vec<String>) -> Self {
        let n = columns.len();
        let coefficients = (0..n)
            .map(|row| {
                (0..n)
                    .map(|col| {
                        if row == col {
                            Coefficient::Defined(1.0)
                        } else {
                            Coefficient::Undefined
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            columns,
            coefficients,
        }
    }
}

/// Pearson coefficient over pairwise-complete observations.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Coefficient {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();
    if xs.len() < 2 || is_constant(&xs) || is_constant(&ys) {
        return Coefficient::Undefined;
    }
    // Scaled into [-1, 1] so squared deviations neither overflow nor underflow.
    let xs = rescaled(xs);
    let ys = rescaled(ys);
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in xs.iter().zip(&ys) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denominator = sxx.sqrt() * syy.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return Coefficient::Undefined;
    }
    Coefficient::Defined((sxy / denominator).clamp(-1.0, 1.0))
}

fn rescaled(values: Vec<f64>) -> Vec<f64> {
    let scale = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return values;
    }
    values.into_iter().map(|v| v / scale).collect()
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

pub fn correlation_matrix(
    dataset: &Dataset,
    columns: &[String],
) -> AnalysisResult<CorrelationMatrix> {
    let views = columns
        .iter()
        .map(|name| dataset.numeric_column(name))
        .collect::<AnalysisResult<Vec<_>>>()?;
    let mut matrix = CorrelationMatrix::undefined(columns.to_vec());
    for (i, j) in (0..columns.len()).tuple_combinations() {
        let coefficient = pearson(&views[i], &views[j]);
        debug!(
            "corr({}, {}) = {:?}",
            columns[i], columns[j], coefficient
        );
        matrix.coefficients[i][j] = coefficient;
        matrix.coefficients[j][i] = coefficient;
    }
    Ok(matrix)
}

/// Matrix over every numeric column of the dataset, in schema order.
pub fn numeric_correlation_matrix(dataset: &Dataset) -> AnalysisResult<CorrelationMatrix> {
    correlation_matrix(dataset, &dataset.schema().numeric_columns())
}
