//! # Row Mapping
//!
//! Turns a grid of display-text cells into records. The first row of the grid
//! supplies the field names; every following row becomes one [`Record`].
//!
//! ```text
//! [["name", "age"],          [{"name": "Ann", "age": "30"},
//!  ["Ann",  "30" ],    =>     {"name": "Bo",  "age": "41"}]
//!  ["Bo",   "41" ]]
//! ```
mod record;

pub use record::Record;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while mapping grid rows to records.
#[derive(Error, Debug)]
pub enum MappingError {
    /// A data row does not have one cell per field name (strict policy only).
    #[error("Row {row} has {actual} cells but the header has {expected} field names")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A record could not be read into the requested fixed-shape type.
    #[error("Parse record at row {row} failed: {source}")]
    RecordError {
        row: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// How rows whose length differs from the header are handled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum JaggedRowPolicy {
    /// Assign only the columns both the header and the row have.
    #[default]
    Truncate,
    /// Reject the row with [`MappingError::SchemaMismatch`].
    Strict,
}

/// Options for [`map_rows_with`].
#[derive(Copy, Clone, Debug, Default)]
pub struct MappingOptions {
    pub policy: JaggedRowPolicy,
}

impl MappingOptions {
    pub fn strict() -> Self {
        MappingOptions {
            policy: JaggedRowPolicy::Strict,
        }
    }
}

/// Maps grid rows to records, truncating jagged rows.
///
/// Row 0 is always taken as the header. The result holds one record per
/// remaining row, in row order, and is empty for grids with fewer than two rows.
pub fn map_rows<R, S>(grid: &[R]) -> Vec<Record>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let Some((header, rows)) = grid.split_first() else {
        return Vec::new();
    };
    let field_names = header.as_ref();
    rows.iter()
        .map(|row| to_record(field_names, row.as_ref()))
        .collect()
}

/// Maps grid rows to records using the given options.
pub fn map_rows_with<R, S>(grid: &[R], options: &MappingOptions) -> Result<Vec<Record>, MappingError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    if options.policy == JaggedRowPolicy::Strict {
        if let Some((header, rows)) = grid.split_first() {
            let expected = header.as_ref().len();
            for (index, row) in rows.iter().enumerate() {
                let actual = row.as_ref().len();
                if actual != expected {
                    Err(MappingError::SchemaMismatch {
                        row: index + 1,
                        expected,
                        actual,
                    })?;
                }
            }
        }
    }
    Ok(map_rows(grid))
}

/// Maps grid rows and reads every record into `T` by field name.
pub fn map_rows_as<T, R, S>(grid: &[R], options: &MappingOptions) -> Result<Vec<T>, MappingError>
where
    T: DeserializeOwned,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    map_rows_with(grid, options)?
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .parse()
                .map_err(|source| MappingError::RecordError { row: index + 1, source })
        })
        .collect()
}

/// Header names with duplicates removed, in first-occurrence order.
///
/// These are exactly the keys a record can carry.
pub fn distinct_field_names<R, S>(grid: &[R]) -> Vec<String>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut names = Vec::<String>::new();
    if let Some(header) = grid.first() {
        for name in header.as_ref() {
            let name = name.as_ref();
            if !names.iter().any(|known| known == name) {
                names.push(name.to_owned());
            }
        }
    }
    names
}

/// Renders records as a JSON array.
pub fn to_json(records: &[Record], pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(records)
    } else {
        serde_json::to_string(records)
    }
}

fn to_record<S: AsRef<str>>(field_names: &[S], row: &[S]) -> Record {
    let mut record = Record::with_capacity(field_names.len().min(row.len()));
    for (name, value) in field_names.iter().zip(row) {
        record.insert(name.as_ref(), value.as_ref());
    }
    record
}
