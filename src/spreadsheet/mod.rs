//! # Spreadsheet Processing Module
//!
//! Readers for Office Open XML workbooks (.xlsx, .xlsm, .xltx, .xltm, .xlam)
//! and OpenDocument spreadsheets (.ods), plus the grid extraction that turns
//! one sheet, table or range into rows of display text.
pub(crate) mod cell;
pub(crate) mod criteria;
mod excel;
pub(crate) mod ods;
pub(crate) mod range;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod table;
pub(crate) mod xlsx;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::error::SheetRecordsError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::range::Range;
use crate::spreadsheet::sheet::Grid;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::table::Table;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Errors raised while locating and reading spreadsheet content
#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    #[error("Invalid cell value at '{0}': {1}")]
    CellValueError(String, String),

    #[error("Missing file '{0}' in spreadsheet package")]
    FileError(String),

    #[error("'{0}' is not a valid spreadsheet package")]
    FileFormatError(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Unsupported spreadsheet format '{0}'")]
    UnsupportedFormatError(String),

    #[error("No sheet matches '{1}' in '{0}'")]
    SheetNotFoundError(String, String),

    #[error("Table '{1}' not found in '{0}'")]
    TableNotFoundError(String, String),
}

/// Common interface of the spreadsheet readers
pub(crate) trait Spreadsheet {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Returns sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Loads the data tables declared on a sheet, in declaration order
    fn load_tables(&mut self, sheet_name: &str) -> Result<Vec<Table>, SheetRecordsError>;

    /// Reads the non-empty cells of a sheet inside the optional range
    fn read_sheet(&mut self, sheet_name: &str, range: Option<Range>) -> Result<Sheet, SheetRecordsError>;
}

/// Opens a spreadsheet, choosing the reader by file extension
pub(crate) fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, SheetRecordsError> {
    let extension = UnifiedReader::extension(file_name).unwrap_or_default();
    let spreadsheet: Box<dyn Spreadsheet> = match extension.as_str() {
        "xlsx" | "xlsm" | "xltx" | "xltm" | "xlam" => Box::new(XlsxSpreadsheet::open(file_name)?),
        "ods" => Box::new(OdsSpreadsheet::open(file_name)?),
        _ => Err(SpreadsheetError::UnsupportedFormatError(file_name.to_owned()))?,
    };
    Ok(spreadsheet)
}

/// Display text of the block selected from a spreadsheet
#[derive(Debug)]
pub(crate) struct SheetGrid {
    /// Sheet the grid was read from
    pub(crate) sheet_name: String,
    /// Table the grid covers, if one was used
    pub(crate) table_name: Option<String>,
    /// Rows of display text; the first row holds the field names
    pub(crate) grid: Grid,
}

/// Reads the grid of display text selected by the criteria
///
/// The block is chosen by the first applicable rule:
/// 1. the explicit range
/// 2. the named table, searched across the accepted sheets in order
/// 3. the first table declared on the selected sheet
/// 4. the used range of the selected sheet
pub(crate) fn read_grid(file_name: &str, criteria: &Criteria) -> Result<SheetGrid, SheetRecordsError> {
    let mut spreadsheet = open_spreadsheet(file_name)?;
    let sheet_names: Vec<String> = spreadsheet
        .sheet_names()
        .into_iter()
        .filter(|sheet_name| criteria.accept(sheet_name))
        .collect();
    let first_sheet = sheet_names.first().cloned().ok_or_else(|| SpreadsheetError::SheetNotFoundError(
        spreadsheet.name(),
        criteria.sheet_name_pattern.as_ref().map(|pattern| pattern.as_str().to_owned()).unwrap_or_default(),
    ))?;

    let (sheet_name, table) = if criteria.range.is_some() {
        (first_sheet, None)
    } else if let Some(table_name) = &criteria.table_name {
        find_table(spreadsheet.as_mut(), &sheet_names, criteria)?
            .ok_or_else(|| SpreadsheetError::TableNotFoundError(spreadsheet.name(), table_name.to_owned()))?
    } else {
        let table = spreadsheet.load_tables(&first_sheet)?.into_iter().next();
        (first_sheet, table)
    };

    let range = criteria.range.or(table.as_ref().map(|table| table.range));
    debug!(
        file = file_name,
        sheet = sheet_name.as_str(),
        table = table.as_ref().map(|table| table.name.as_str()),
        ?range,
        "selected spreadsheet block"
    );
    let sheet = spreadsheet.read_sheet(&sheet_name, range)?;
    if sheet.is_empty() {
        warn!(file = file_name, sheet = sheet_name.as_str(), "selected block has no cells");
    }
    let grid = sheet.to_grid()?;
    info!(
        file = file_name,
        sheet = sheet_name.as_str(),
        rows = grid.len(),
        columns = grid.first().map(Vec::len).unwrap_or(0),
        "read spreadsheet grid"
    );
    Ok(SheetGrid {
        sheet_name,
        table_name: table.map(|table| table.name),
        grid,
    })
}

/// Searches the accepted sheets in order for the requested table
fn find_table(
    spreadsheet: &mut dyn Spreadsheet,
    sheet_names: &[String],
    criteria: &Criteria,
) -> Result<Option<(String, Option<Table>)>, SheetRecordsError> {
    for sheet_name in sheet_names {
        let tables = spreadsheet.load_tables(sheet_name)?;
        if let Some(table) = tables.into_iter().find(|table| criteria.accept_table(&table.name)) {
            return Ok(Some((sheet_name.to_owned(), Some(table))));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures;
    use glob::Pattern;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter().map(|row| row.iter().map(|cell| cell.to_string()).collect()).collect()
    }

    fn criteria(sheet: Option<&str>, table: Option<&str>, range: Option<&str>) -> Criteria {
        Criteria {
            sheet_name_pattern: sheet.map(|pattern| Pattern::new(pattern).unwrap()),
            table_name: table.map(str::to_owned),
            range: range.map(|range| Range::try_from(range).unwrap()),
        }
    }

    #[test]
    fn xlsx_used_range() {
        fixtures::init_test_logging();
        let file = fixtures::variables_xlsx();
        let result = read_grid(fixtures::path(&file), &Criteria::default()).unwrap();
        assert_eq!(result.sheet_name, "Variables");
        assert_eq!(result.table_name, None);
        assert_eq!(result.grid, grid(&[
            &["PFF_VARIABLE", "DOMAIN", "NOTES"],
            &["pff_001", "Income", ""],
            &["pff_002", "Expenses", "Calculated"],
        ]));
    }

    #[test]
    fn xlsx_display_text() {
        fixtures::init_test_logging();
        let file = fixtures::typed_xlsx(false);
        let result = read_grid(fixtures::path(&file), &Criteria::default()).unwrap();
        assert_eq!(result.grid, grid(&[
            &["name", "age", "active", "joined", "start", "ratio", "error"],
            &["Alice", "30", "TRUE", "2024-01-31", "13:45:00", "3.14", "#N/A"],
        ]));
    }

    #[test]
    fn xlsx_1904_date_system() {
        let file = fixtures::typed_xlsx(true);
        let result = read_grid(fixtures::path(&file), &Criteria::default()).unwrap();
        assert_eq!(result.grid[1][3], "2028-02-01");
    }

    #[test]
    fn xlsx_first_table_on_sheet() {
        fixtures::init_test_logging();
        let file = fixtures::tables_xlsx();
        let result = read_grid(fixtures::path(&file), &Criteria::default()).unwrap();
        assert_eq!(result.sheet_name, "Data");
        assert_eq!(result.table_name.as_deref(), Some("Regions"));
        assert_eq!(result.grid, grid(&[
            &["region", "code"],
            &["North", "N"],
        ]));
    }

    #[test]
    fn xlsx_named_table_across_sheets() {
        let file = fixtures::tables_xlsx();
        let result = read_grid(fixtures::path(&file), &criteria(None, Some("PRODUCTS"), None)).unwrap();
        assert_eq!(result.sheet_name, "Catalog");
        assert_eq!(result.table_name.as_deref(), Some("Products"));
        assert_eq!(result.grid, grid(&[
            &["sku", "price"],
            &["A-1", "9.5"],
            &["B-2", "12"],
        ]));
    }

    #[test]
    fn xlsx_missing_table() {
        let file = fixtures::tables_xlsx();
        let error = read_grid(fixtures::path(&file), &criteria(None, Some("Orders"), None)).unwrap_err();
        assert!(error.to_string().starts_with("Table 'Orders' not found"), "{error}");
    }

    #[test]
    fn explicit_range_wins_over_tables() {
        let file = fixtures::tables_xlsx();
        let result = read_grid(fixtures::path(&file), &criteria(None, Some("Products"), Some("D1:E2"))).unwrap();
        assert_eq!(result.sheet_name, "Data");
        assert_eq!(result.table_name, None);
        assert_eq!(result.grid, grid(&[
            &["note"],
            &["free text"],
        ]));
    }

    #[test]
    fn sheet_pattern() {
        let file = fixtures::tables_xlsx();
        let result = read_grid(fixtures::path(&file), &criteria(Some("Cat*"), None, None)).unwrap();
        assert_eq!(result.sheet_name, "Catalog");
        assert_eq!(result.table_name.as_deref(), Some("Products"));

        let error = read_grid(fixtures::path(&file), &criteria(Some("Summary"), None, None)).unwrap_err();
        assert!(error.to_string().starts_with("No sheet matches 'Summary'"), "{error}");
    }

    #[test]
    fn unsupported_format() {
        let error = read_grid("data.csv", &Criteria::default()).unwrap_err();
        assert_eq!(error.to_string(), "Unsupported spreadsheet format 'data.csv'");
    }

    #[test]
    fn ods_used_range() {
        fixtures::init_test_logging();
        let file = fixtures::variables_ods(false);
        let result = read_grid(fixtures::path(&file), &criteria(Some("Variables"), None, None)).unwrap();
        assert_eq!(result.sheet_name, "Variables");
        assert_eq!(result.grid, grid(&[
            &["PFF_VARIABLE", "DOMAIN", "NOTES", "CHECKED"],
            &["pff_001", "Income", "", "TRUE"],
            &["pff_002", "Expenses", "multi\nline", "FALSE"],
            &["pff_003", "Expenses", "", "FALSE"],
        ]));
    }

    #[test]
    fn ods_value_attributes() {
        let file = fixtures::variables_ods(false);
        let result = read_grid(fixtures::path(&file), &criteria(Some("Values"), None, None)).unwrap();
        assert_eq!(result.grid, grid(&[
            &["when", "duration", "amount"],
            &["2024-01-31 08:30:00", "13:45:00", "30"],
        ]));
    }

    #[test]
    fn ods_database_range() {
        let file = fixtures::variables_ods(false);
        let result = read_grid(fixtures::path(&file), &criteria(None, Some("domains"), None)).unwrap();
        assert_eq!(result.sheet_name, "Lookup");
        assert_eq!(result.table_name.as_deref(), Some("Domains"));
        assert_eq!(result.grid, grid(&[
            &["DOMAIN"],
            &["Income"],
            &["Expenses"],
        ]));
    }

    #[test]
    fn ods_first_database_range_on_sheet() {
        let file = fixtures::variables_ods(false);
        let result = read_grid(fixtures::path(&file), &criteria(Some("Look*"), None, None)).unwrap();
        assert_eq!(result.table_name.as_deref(), Some("Domains"));
        assert_eq!(result.grid.len(), 3);
    }

    #[test]
    fn ods_password_protected() {
        let file = fixtures::variables_ods(true);
        let error = read_grid(fixtures::path(&file), &Criteria::default()).unwrap_err();
        assert!(error.to_string().ends_with("is password protected"), "{error}");
    }
}
