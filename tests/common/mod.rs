#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use athlete_insights::{
    data::Value,
    dataset::Dataset,
    schema::{
        ColumnMeta, ColumnType, GENDER, HRV, INJURY_RISK_SCORE, PERCEIVED_STRESS,
        PERFORMANCE_SCORE, RESTING_HEART_RATE, SLEEP_HOURS, SPORT, Schema, TRAINING_HOURS,
    },
};
use tempfile::{TempDir, tempdir};

pub const ATHLETES: &str = "athletes.csv";
pub const ATHLETES_SCHEMA: &str = "athletes-schema.yml";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Column order used by [`athlete_dataset`].
pub const NUMERIC_ORDER: [&str; 7] = [
    TRAINING_HOURS,
    RESTING_HEART_RATE,
    HRV,
    PERCEIVED_STRESS,
    SLEEP_HOURS,
    PERFORMANCE_SCORE,
    INJURY_RISK_SCORE,
];

/// One athlete row: the seven metrics in [`NUMERIC_ORDER`], then gender and sport.
pub type AthleteRow<'a> = ([Option<f64>; 7], Option<&'a str>, Option<&'a str>);

pub fn athlete_dataset(rows: &[AthleteRow<'_>]) -> Dataset {
    let mut columns = NUMERIC_ORDER
        .iter()
        .map(|name| ColumnMeta::new(*name, ColumnType::Float))
        .collect::<Vec<_>>();
    columns.push(ColumnMeta::new(GENDER, ColumnType::String));
    columns.push(ColumnMeta::new(SPORT, ColumnType::String));
    let schema = Schema::new(columns).expect("schema");
    let rows = rows
        .iter()
        .map(|(metrics, gender, sport)| {
            let mut row = metrics
                .iter()
                .map(|value| value.map(Value::Float))
                .collect::<Vec<_>>();
            row.push(gender.map(|g| Value::String(g.to_string())));
            row.push(sport.map(|s| Value::String(s.to_string())));
            row
        })
        .collect();
    Dataset::new(schema, rows).expect("dataset")
}

/// Builds rows where only the listed columns vary; every other metric is 50.
pub fn varying(columns: &[(&str, Vec<Option<f64>>)], gender: &[&str]) -> Dataset {
    let len = gender.len();
    let rows = (0..len)
        .map(|row| {
            let mut metrics = [Some(50.0); 7];
            for (name, values) in columns {
                let idx = NUMERIC_ORDER
                    .iter()
                    .position(|c| c == name)
                    .expect("known metric");
                metrics[idx] = values[row];
            }
            (metrics, Some(gender[row]), Some("Rowing"))
        })
        .collect::<Vec<_>>();
    athlete_dataset(&rows)
}
