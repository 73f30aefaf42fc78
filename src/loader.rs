//! CSV ingestion into a [`Dataset`].
//!
//! With an explicit schema the file headers must match it exactly; without one
//! the schema is inferred from a full scan of the file.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::parse_typed_value,
    dataset::{Dataset, Row},
    io_utils,
    schema::{self, Schema},
};

pub fn load_dataset(
    path: &Path,
    schema: Option<&Schema>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Dataset> {
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => {
            if io_utils::is_dash(path) {
                return Err(anyhow!(
                    "Reading from stdin requires --schema so column types are known"
                ));
            }
            schema::infer_schema(path, 0, delimiter, encoding)?
        }
    };
    debug!(
        "Loading {:?} with {} declared column(s)",
        path,
        schema.columns.len()
    );

    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    schema
        .validate_headers(&headers)
        .with_context(|| format!("Validating headers for {path:?}"))?;

    let mut rows: Vec<Row> = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        let row = parse_row(&schema, &decoded)
            .with_context(|| format!("Parsing row {} in {path:?}", row_idx + 2))?;
        rows.push(row);
    }

    info!(
        "Loaded {} row(s) across {} column(s) from {:?}",
        rows.len(),
        schema.columns.len(),
        path
    );
    Dataset::new(schema, rows).with_context(|| format!("Building dataset from {path:?}"))
}

/// Short rows are padded with missing cells; surplus fields are an error.
fn parse_row(schema: &Schema, raw: &[String]) -> Result<Row> {
    if raw.len() > schema.columns.len() {
        return Err(anyhow!(
            "Row has {} field(s) but the schema declares {} column(s)",
            raw.len(),
            schema.columns.len()
        ));
    }
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = raw.get(idx).map(|s| s.as_str()).unwrap_or("");
            parse_typed_value(value, &column.datatype)
                .with_context(|| format!("Column '{}'", column.name))
        })
        .collect()
}
