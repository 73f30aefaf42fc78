//! Schema model, YAML persistence, type inference, and required-column checks.
//!
//! A [`Schema`] is the ordered list of declared columns for one dataset. It is
//! fixed once the dataset is loaded. Three column types exist: `integer` and
//! `float` (numeric) and `string` (categorical).
//!
//! ## Responsibilities
//!
//! - YAML schema loading and saving via `serde_yaml`
//! - Type inference over a sample of CSV rows
//! - Validation that the athlete columns the analysis depends on are present
//!   with a compatible type

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    data::is_missing_token,
    error::{AnalysisError, AnalysisResult},
    io_utils,
};

pub const TRAINING_HOURS: &str = "Training_Hours_per_Week";
pub const RESTING_HEART_RATE: &str = "Resting_Heart_Rate";
pub const HRV: &str = "HRV";
pub const PERCEIVED_STRESS: &str = "Perceived_Stress_Score";
pub const SLEEP_HOURS: &str = "Sleep_Hours";
pub const PERFORMANCE_SCORE: &str = "Performance_Score";
pub const INJURY_RISK_SCORE: &str = "Injury_Risk_Score";
pub const GENDER: &str = "Gender";
pub const SPORT: &str = "Sport";

/// Numeric columns examined together in the key-metrics view.
pub const KEY_METRICS: &[&str] = &[
    TRAINING_HOURS,
    RESTING_HEART_RATE,
    HRV,
    PERCEIVED_STRESS,
    SLEEP_HOURS,
    PERFORMANCE_SCORE,
    INJURY_RISK_SCORE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredColumn<'a> {
    pub name: &'a str,
    pub kind: ColumnKind,
}

pub const REQUIRED_COLUMNS: &[RequiredColumn<'static>] = &[
    RequiredColumn {
        name: TRAINING_HOURS,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: RESTING_HEART_RATE,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: HRV,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: PERCEIVED_STRESS,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: SLEEP_HOURS,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: PERFORMANCE_SCORE,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: INJURY_RISK_SCORE,
        kind: ColumnKind::Numeric,
    },
    RequiredColumn {
        name: GENDER,
        kind: ColumnKind::Categorical,
    },
    RequiredColumn {
        name: SPORT,
        kind: ColumnKind::Categorical,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnType::Integer | ColumnType::Float => ColumnKind::Numeric,
            ColumnType::String => ColumnKind::Categorical,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "integer" | "int" => Ok(ColumnType::Integer),
            "float" | "double" | "number" => Ok(ColumnType::Float),
            "string" | "text" | "categorical" => Ok(ColumnType::String),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: integer, float, string"
            )),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnMeta>) -> AnalysisResult<Self> {
        let schema = Schema { columns };
        schema.ensure_unique_names()?;
        Ok(schema)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric column names in declaration order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.datatype.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Checks that every required column is declared with a compatible type.
    /// The first violation is reported; nothing downstream runs on a partial schema.
    pub fn require(&self, required: &[RequiredColumn<'_>]) -> AnalysisResult<()> {
        for requirement in required {
            let column = self
                .column(requirement.name)
                .ok_or_else(|| AnalysisError::MissingColumn {
                    column: requirement.name.to_string(),
                })?;
            if column.datatype.kind() != requirement.kind {
                return Err(AnalysisError::ColumnTypeMismatch {
                    column: requirement.name.to_string(),
                    expected: requirement.kind.as_str(),
                    found: column.datatype.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn validate_headers(&self, headers: &[String]) -> Result<()> {
        if headers.len() != self.columns.len() {
            return Err(anyhow!(
                "Header length mismatch: schema expects {} column(s) but file contains {}",
                self.columns.len(),
                headers.len()
            ));
        }
        for (idx, column) in self.columns.iter().enumerate() {
            let name = headers.get(idx).map(|s| s.trim()).unwrap_or_default();
            if name != column.name {
                return Err(anyhow!(
                    "Header mismatch at position {}: expected '{}' but found '{}'",
                    idx + 1,
                    column.name,
                    name
                ));
            }
        }
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing schema to YAML string")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: Schema = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema.ensure_unique_names()?;
        Ok(schema)
    }

    fn ensure_unique_names(&self) -> AnalysisResult<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(AnalysisError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct TypeCandidate {
    observed: usize,
    integer_ok: bool,
    float_ok: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            observed: 0,
            integer_ok: true,
            float_ok: true,
        }
    }

    fn update(&mut self, value: &str) {
        self.observed += 1;
        if self.integer_ok && value.parse::<i64>().is_err() {
            self.integer_ok = false;
        }
        if self.float_ok && value.parse::<f64>().is_err() {
            self.float_ok = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.observed == 0 {
            ColumnType::Float
        } else if self.integer_ok {
            ColumnType::Integer
        } else if self.float_ok {
            ColumnType::Float
        } else {
            ColumnType::String
        }
    }
}

/// Samples up to `sample_rows` records (0 means all) and picks the narrowest
/// type every non-missing value parses as.
pub fn infer_schema(
    path: &Path,
    sample_rows: usize,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Schema> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let mut candidates = vec![TypeCandidate::new(); headers.len()];

    let mut record = csv::ByteRecord::new();
    let mut processed = 0usize;
    while reader.read_byte_record(&mut record)? {
        if sample_rows > 0 && processed >= sample_rows {
            break;
        }
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", processed + 2))?;
        for (idx, value) in decoded.iter().enumerate().take(headers.len()) {
            if is_missing_token(value) {
                continue;
            }
            candidates[idx].update(value.trim());
        }
        processed += 1;
    }

    let columns = headers
        .into_iter()
        .zip(candidates)
        .map(|(name, candidate)| ColumnMeta::new(name, candidate.decide()))
        .collect();
    Schema::new(columns).with_context(|| format!("Inferring schema from {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn athlete_schema() -> Schema {
        let mut columns = KEY_METRICS
            .iter()
            .map(|name| ColumnMeta::new(*name, ColumnType::Float))
            .collect::<Vec<_>>();
        columns.push(ColumnMeta::new(GENDER, ColumnType::String));
        columns.push(ColumnMeta::new(SPORT, ColumnType::String));
        Schema::new(columns).unwrap()
    }

    #[test]
    fn require_accepts_complete_athlete_schema() {
        athlete_schema().require(REQUIRED_COLUMNS).unwrap();
    }

    #[test]
    fn require_names_first_missing_column() {
        let mut schema = athlete_schema();
        schema.columns.retain(|c| c.name != HRV);
        let err = schema.require(REQUIRED_COLUMNS).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingColumn {
                column: HRV.to_string()
            }
        );
        assert!(err.to_string().contains("HRV"));
    }

    #[test]
    fn require_rejects_categorical_metric() {
        let mut schema = athlete_schema();
        let idx = schema.column_index(SLEEP_HOURS).unwrap();
        schema.columns[idx].datatype = ColumnType::String;
        let err = schema.require(REQUIRED_COLUMNS).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ColumnTypeMismatch { ref column, .. } if column == SLEEP_HOURS
        ));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = Schema::new(vec![
            ColumnMeta::new("HRV", ColumnType::Float),
            ColumnMeta::new("HRV", ColumnType::Integer),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DuplicateColumn {
                column: "HRV".to_string()
            }
        );
    }

    #[test]
    fn column_type_round_trips_through_yaml() {
        let schema = Schema::new(vec![
            ColumnMeta::new("Age", ColumnType::Integer),
            ColumnMeta::new("Sport", ColumnType::String),
        ])
        .unwrap();
        let yaml = schema.to_yaml_string().unwrap();
        assert!(yaml.contains("datatype: integer"));
        let parsed: Schema = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn infer_schema_picks_narrowest_type_and_skips_placeholders() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Age,Sleep_Hours,Sport,Empty").unwrap();
        writeln!(file, "21,7.5,Rowing,").unwrap();
        writeln!(file, "NA,6,Swimming,NA").unwrap();
        writeln!(file, "30,n/a,Cycling,").unwrap();
        let schema = infer_schema(file.path(), 0, b',', UTF_8).unwrap();
        let types = schema
            .columns
            .iter()
            .map(|c| c.datatype)
            .collect::<Vec<_>>();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::String,
                ColumnType::Float
            ]
        );
    }

    #[test]
    fn validate_headers_reports_position() {
        let schema = Schema::new(vec![
            ColumnMeta::new("HRV", ColumnType::Float),
            ColumnMeta::new("Sport", ColumnType::String),
        ])
        .unwrap();
        let err = schema
            .validate_headers(&["HRV".to_string(), "Gender".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("position 2"));
    }
}
