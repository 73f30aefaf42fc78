//! In-memory athlete dataset.
//!
//! A [`Dataset`] pairs a [`Schema`] with rows of typed cells. Every row has
//! exactly one cell per declared column; `None` marks a missing value. The
//! dataset is never mutated after construction: derived columns and row
//! subsets produce new datasets.

use crate::{
    data::Value,
    error::{AnalysisError, AnalysisResult},
    schema::{ColumnKind, ColumnMeta, ColumnType, Schema},
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(schema: Schema, rows: Vec<Row>) -> AnalysisResult<Self> {
        let expected = schema.columns.len();
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(AnalysisError::RecordWidth {
                    row: idx + 1,
                    expected,
                    found: row.len(),
                });
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.columns.len()
    }

    fn resolve(&self, name: &str, kind: ColumnKind) -> AnalysisResult<usize> {
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
            })?;
        let datatype = self.schema.columns[idx].datatype;
        if datatype.kind() != kind {
            return Err(AnalysisError::ColumnTypeMismatch {
                column: name.to_string(),
                expected: kind.as_str(),
                found: datatype.to_string(),
            });
        }
        Ok(idx)
    }

    /// Row-aligned numeric view of `name`, missing cells kept as `None`.
    pub fn numeric_column(&self, name: &str) -> AnalysisResult<Vec<Option<f64>>> {
        let idx = self.resolve(name, ColumnKind::Numeric)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row[idx].as_ref().and_then(Value::as_f64))
            .collect())
    }

    /// Row-aligned categorical view of `name`, missing cells kept as `None`.
    pub fn categorical_column(&self, name: &str) -> AnalysisResult<Vec<Option<String>>> {
        let idx = self.resolve(name, ColumnKind::Categorical)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row[idx].as_ref().map(Value::as_display))
            .collect())
    }

    /// Missing cell count for every declared column, in schema order.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.schema
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let missing = self.rows.iter().filter(|row| row[idx].is_none()).count();
                (column.name.clone(), missing)
            })
            .collect()
    }

    /// Returns a new dataset with `values` appended as column `name`, or
    /// replacing an existing column of that name.
    pub fn with_column(
        &self,
        name: &str,
        datatype: ColumnType,
        values: Vec<Option<Value>>,
    ) -> AnalysisResult<Dataset> {
        if values.len() != self.rows.len() {
            return Err(AnalysisError::DerivedLength {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let mut schema = self.schema.clone();
        let mut rows = self.rows.clone();
        match schema.column_index(name) {
            Some(idx) => {
                schema.columns[idx].datatype = datatype;
                for (row, value) in rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                schema.columns.push(ColumnMeta::new(name, datatype));
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(Dataset { schema, rows })
    }

    /// Keeps only rows where every named column is present.
    pub fn complete_rows(&self, columns: &[&str]) -> AnalysisResult<Dataset> {
        let indices = columns
            .iter()
            .map(|name| {
                self.schema
                    .column_index(name)
                    .ok_or_else(|| AnalysisError::MissingColumn {
                        column: name.to_string(),
                    })
            })
            .collect::<AnalysisResult<Vec<_>>>()?;
        Ok(self.filter_rows(|row| indices.iter().all(|idx| row[*idx].is_some())))
    }

    pub fn filter_rows<F>(&self, mut predicate: F) -> Dataset
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row))
            .cloned()
            .collect();
        Dataset {
            schema: self.schema.clone(),
            rows,
        }
    }

    pub fn head(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }
}
