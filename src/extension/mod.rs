//! # Extension Core Module
//!
//! Parameter handling, error types and the record loading shared by the
//! `read_records` and `sheet_to_json` table functions.
use crate::error::SheetRecordsError;
use crate::mapping::distinct_field_names;
use crate::mapping::map_rows_with;
use crate::mapping::JaggedRowPolicy;
use crate::mapping::MappingOptions;
use crate::mapping::Record;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::range::Range;
use crate::spreadsheet::read_grid;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use glob::Pattern;
use thiserror::Error;
use tracing::debug;

pub(crate) mod read_records;
pub(crate) mod sheet_to_json;

/// Errors raised by the table functions themselves
#[derive(Error, Debug)]
pub(crate) enum ExtensionError {
    /// Invalid parameter provided to a table function
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The selected block has no header row to name the output columns
    #[error("No field names found in sheet '{0}'")]
    NoFieldNames(String),
}

/// Positional parameter of a table function
pub(crate) trait Param<T> {
    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle;

    /// Extracts the parameter value at the given position
    fn read(bind: &BindInfo, index: u64) -> Result<T, SheetRecordsError>;
}

/// Named parameter of a table function
///
/// Values are validated while binding, so a bad value fails the query
/// before any file is opened.
pub(crate) trait NamedParam<T> {
    /// Returns the parameter name as used in SQL
    fn name() -> &'static str;

    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle;

    /// Returns the complete parameter definition (name and type)
    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Extracts and validates the parameter value, `None` when not provided
    fn read(bind: &BindInfo) -> Result<Option<T>, SheetRecordsError>;

    /// Builds the error reported for an unusable value
    fn invalid(message: String) -> ExtensionError {
        ExtensionError::InvalidParameter {
            name: Self::name().to_string(),
            message,
        }
    }
}

/// Spreadsheet file path or URL
pub(crate) struct FileParam;

/// Glob pattern selecting the sheet
pub(crate) struct SheetParam;

/// Name of the table to read
pub(crate) struct TableParam;

/// Explicit cell range
pub(crate) struct RangeParam;

/// Rejects rows whose length differs from the header
pub(crate) struct StrictParam;

/// Indents the JSON output
pub(crate) struct PrettyParam;

impl Param<String> for FileParam {
    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo, index: u64) -> Result<String, SheetRecordsError> {
        let file_name = bind.get_parameter(index).to_string();
        if file_name.trim().is_empty() {
            Err(ExtensionError::InvalidParameter {
                name: "file".to_string(),
                message: "file name is empty".to_string(),
            })?;
        }
        Ok(file_name)
    }
}

impl NamedParam<Pattern> for SheetParam {
    fn name() -> &'static str {
        "sheet"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<Pattern>, SheetRecordsError> {
        match bind.get_named_parameter(Self::name()) {
            Some(value) => {
                let pattern = value.to_string();
                Pattern::new(&pattern)
                    .map(Some)
                    .map_err(|error| Self::invalid(format!("'{pattern}' is not a sheet name pattern: {error}")).into())
            }
            None => Ok(None),
        }
    }
}

impl NamedParam<String> for TableParam {
    fn name() -> &'static str {
        "table"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, SheetRecordsError> {
        match bind.get_named_parameter(Self::name()) {
            Some(value) => {
                let name = value.to_string();
                if name.trim().is_empty() {
                    Err(Self::invalid("table name is empty".to_string()))?;
                }
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }
}

impl NamedParam<Range> for RangeParam {
    fn name() -> &'static str {
        "range"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<Range>, SheetRecordsError> {
        match bind.get_named_parameter(Self::name()) {
            Some(value) => {
                let range = value.to_string();
                Range::try_from(range.as_str())
                    .map(Some)
                    .map_err(|_| Self::invalid(format!("'{range}' is not a data range")).into())
            }
            None => Ok(None),
        }
    }
}

impl NamedParam<bool> for StrictParam {
    fn name() -> &'static str {
        "strict"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Boolean)
    }

    fn read(bind: &BindInfo) -> Result<Option<bool>, SheetRecordsError> {
        bind.get_named_parameter(Self::name())
            .map(|value| parse_bool(&value.to_string()).ok_or_else(|| Self::invalid(format!("'{value}' is not a boolean")).into()))
            .transpose()
    }
}

impl NamedParam<bool> for PrettyParam {
    fn name() -> &'static str {
        "pretty"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Boolean)
    }

    fn read(bind: &BindInfo) -> Result<Option<bool>, SheetRecordsError> {
        bind.get_named_parameter(Self::name())
            .map(|value| parse_bool(&value.to_string()).ok_or_else(|| Self::invalid(format!("'{value}' is not a boolean")).into()))
            .transpose()
    }
}

/// Parses the text form of a DuckDB boolean
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Parameters shared by both table functions
pub(crate) struct SheetParameters {
    /// Path or URL of the spreadsheet file
    pub(crate) file_name: String,
    /// Sheet, table and range selection
    pub(crate) criteria: Criteria,
    /// Jagged row handling
    pub(crate) options: MappingOptions,
}

impl TryFrom<&BindInfo> for SheetParameters {
    type Error = SheetRecordsError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        let policy = match StrictParam::read(bind)? {
            Some(true) => JaggedRowPolicy::Strict,
            _ => JaggedRowPolicy::Truncate,
        };
        Ok(SheetParameters {
            file_name: FileParam::read(bind, 0)?,
            criteria: Criteria {
                sheet_name_pattern: SheetParam::read(bind)?,
                table_name: TableParam::read(bind)?,
                range: RangeParam::read(bind)?,
            },
            options: MappingOptions { policy },
        })
    }
}

/// Records read from one spreadsheet block
pub(crate) struct SheetRecords {
    /// Sheet the records come from
    pub(crate) sheet_name: String,
    /// Distinct field names in header order
    pub(crate) field_names: Vec<String>,
    /// One record per data row
    pub(crate) records: Vec<Record>,
}

/// Reads the selected block and maps its rows to records
pub(crate) fn load_records(parameters: &SheetParameters) -> Result<SheetRecords, SheetRecordsError> {
    let sheet_grid = read_grid(&parameters.file_name, &parameters.criteria)?;
    let field_names = distinct_field_names(&sheet_grid.grid);
    let records = map_rows_with(&sheet_grid.grid, &parameters.options)?;
    debug!(
        file = parameters.file_name.as_str(),
        sheet = sheet_grid.sheet_name.as_str(),
        table = sheet_grid.table_name.as_deref(),
        fields = field_names.len(),
        records = records.len(),
        "mapped rows to records"
    );
    Ok(SheetRecords {
        sheet_name: sheet_grid.sheet_name,
        field_names,
        records,
    })
}
