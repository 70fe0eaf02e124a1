use crate::error::SheetRecordsError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::range::Range;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::table::Table;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// XML element name for spreadsheet root
const SPREADSHEET: QName = QName(b"office:spreadsheet");
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for named database ranges
const DATABASE_RANGE: QName = QName(b"table:database-range");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const STRING: QName = QName(b"text:s");
/// XML element name for tab characters
const TAB: QName = QName(b"text:tab");
/// XML element name for line breaks inside a paragraph
const LINE_BREAK: QName = QName(b"text:line-break");

/// Prefix of the database ranges LibreOffice creates for sorting and filtering
const ANONYMOUS_DATABASE_RANGE: &str = "__Anonymous_Sheet_DB__";

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub(crate) enum OdsError {
    /// Invalid ODS MIME type detected in file
    #[error("Invalid ODS MIME type")]
    MimeTypeError,

    /// Cell range address of a database range cannot be parsed
    #[error("Invalid cell range address '{0}'")]
    RangeAddressError(String),
}

/// ODS spreadsheet handler for reading OpenDocument Spreadsheet files
pub(crate) struct OdsSpreadsheet {
    /// Name of the ODS file
    pub(crate) name: String,
    /// ZIP archive containing the ODS file contents
    zip: ZipArchive<UnifiedReader>,
    /// Sheet names in document order
    sheets: Vec<String>,
    /// Named database ranges with the sheet they target
    tables: Vec<(String, Table)>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file and validates its format
    ///
    /// # Arguments
    /// * `file_name` - Path or URL of the ODS file to open
    ///
    /// # Returns
    /// * `Result<Self, SheetRecordsError>` - ODS spreadsheet instance or error
    pub(crate) fn open(file_name: &str) -> Result<Self, SheetRecordsError> {
        let reader = UnifiedReader::new(file_name)?;
        let mut zip = ZipArchive::new(reader)
            .map_err(|_| SpreadsheetError::FileFormatError(file_name.to_owned()))?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        let (sheets, tables) = load_structure(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?;
        }
        debug!(file = file_name, sheets = sheets.len(), tables = tables.len(), "opened ods document");
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
            sheets,
            tables,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    /// Returns the name of the ODS file
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.to_owned()
    }

    /// Returns the database ranges targeting a sheet, in document order
    fn load_tables(&mut self, sheet_name: &str) -> Result<Vec<Table>, SheetRecordsError> {
        if !self.sheets.iter().any(|name| name == sheet_name) {
            Err(SpreadsheetError::SheetNotFoundError(self.name.to_owned(), sheet_name.to_owned()))?;
        }
        Ok(self.tables
            .iter()
            .filter(|(name, _)| name == sheet_name)
            .map(|(_, table)| table.to_owned())
            .collect())
    }

    /// Reads the cells of one sheet that fall inside the range
    ///
    /// A cell's paragraph text is what LibreOffice renders, so it wins over
    /// the typed `office:*-value` attributes whenever present.
    fn read_sheet(&mut self, sheet_name: &str, range: Option<Range>) -> Result<Sheet, SheetRecordsError> {
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_owned()))?;
        let mut found = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == SPREADSHEET => break,
            Event::Start(event) if event.name() == TABLE => {
                if event.get_attribute_value("table:name")?.map(|name| name == sheet_name).unwrap_or(false) {
                    found = true;
                    break;
                }
            }
        });
        if !found {
            Err(SpreadsheetError::SheetNotFoundError(self.name.to_owned(), sheet_name.to_owned()))?;
        }

        let mut sheet = Sheet::new(&self.name, sheet_name, range);
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut text = String::new();
        let mut has_paragraph = false;
        let mut depth = 0usize; // nested tables inside cells
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => depth += 1,
            Event::End(event) if event.name() == TABLE => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Start(event) if depth == 0 && event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if depth == 0 && event.name() == TABLE_ROW => {
                row += row_count;
                if sheet.after_row_upper_bound(row) {
                    break;
                }
            }
            Event::Start(event) if depth == 0 && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                value.clear();
                text.clear();
                has_paragraph = false;
                comment_context = false;
                col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                kind = CellType::Empty;
                if let Some(value_type) = event.get_attribute_value("office:value-type")? {
                    let (cell_type, attribute) = match value_type.as_ref() {
                        "boolean" => (CellType::Boolean, "office:boolean-value"),
                        "date" => (CellType::IsoDateTime, "office:date-value"),
                        "time" => (CellType::IsoDuration, "office:time-value"),
                        "string" => (CellType::Text, "office:string-value"),
                        _ => (CellType::Number, "office:value"),
                    };
                    if let Some(data) = event.get_attribute_value(attribute)? {
                        value.push_str(&data);
                    }
                    kind = cell_type;
                }
            }
            Event::End(event) if depth == 0 && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                if has_paragraph {
                    kind = CellType::Text;
                    std::mem::swap(&mut value, &mut text);
                }
                if kind != CellType::Empty && !value.is_empty() {
                    for row_offset in 0..row_count {
                        let row_number = row + row_offset;
                        if sheet.before_row_lower_bound(row_number) {
                            continue;
                        } else if sheet.after_row_upper_bound(row_number) {
                            break;
                        }
                        for col_offset in 0..col_count {
                            let col_number = col + col_offset;
                            if sheet.after_col_upper_bound(col_number) {
                                break;
                            }
                            sheet.push(Cell {
                                row: row_number,
                                col: col_number,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                }
                col += col_count;
            }
            // Paragraph content of the current cell
            Event::Start(event) if event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if depth == 0 && !comment_context && event.name() == PARAGRAPH => {
                if has_paragraph {
                    text.push('\n');
                }
                has_paragraph = true;
            }
            Event::Start(event) if depth == 0 && !comment_context && event.name() == STRING => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    text.push(' ');
                }
            }
            Event::Start(event) if depth == 0 && !comment_context && event.name() == TAB => text.push('\t'),
            Event::Start(event) if depth == 0 && !comment_context && event.name() == LINE_BREAK => text.push('\n'),
            Event::Text(event) if depth == 0 && !comment_context && has_paragraph => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) if depth == 0 && !comment_context && has_paragraph => text.push_bytes_ref(&event)?,
        });
        Ok(sheet)
    }
}

/// Validates that the ZIP archive contains a valid ODS file by checking MIME type
///
/// # Arguments
/// * `zip` - ZIP archive to validate
///
/// # Returns
/// * `Result<(), SheetRecordsError>` - Success or MIME type error
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), SheetRecordsError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks if the ODS file is password protected by examining the manifest
///
/// # Arguments
/// * `zip` - ZIP archive to check
///
/// # Returns
/// * `Result<bool, SheetRecordsError>` - True if password protected, false otherwise
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, SheetRecordsError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}

/// Scans `content.xml` for sheet names and named database ranges
fn load_structure(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<String>, Vec<(String, Table)>), SheetRecordsError> {
    let mut reader = zip
        .xml_reader("content.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_owned()))?;
    let mut sheets = Vec::<String>::new();
    let mut tables = Vec::<(String, Table)>::new();
    let mut depth = 0usize;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            if depth == 0 {
                if let Some(name) = event.get_attribute_value("table:name")? {
                    sheets.push(name.to_string());
                }
            }
            depth += 1;
        }
        Event::End(event) if event.name() == TABLE => depth = depth.saturating_sub(1),
        Event::Start(event) if event.name() == DATABASE_RANGE => {
            let name = event.get_attribute_value("table:name")?;
            let address = event.get_attribute_value("table:target-range-address")?;
            if let Some((name, address)) = name.zip(address) {
                if !name.starts_with(ANONYMOUS_DATABASE_RANGE) {
                    let (sheet_name, range) = parse_range_address(&address)?;
                    tables.push((sheet_name, Table { name: name.to_string(), range }));
                }
            }
        }
        Event::End(event) if event.name() == SPREADSHEET => break,
    });
    Ok((sheets, tables))
}

/// Parses an OpenDocument cell range address into its sheet name and range
///
/// Accepts `Sheet1.A1:Sheet1.C4`, `$'My Sheet'.$A$1:.$C$4` and single cells
/// (`Sheet1.B2`). The end cell may omit its sheet name.
pub(crate) fn parse_range_address(address: &str) -> Result<(String, Range), SheetRecordsError> {
    let error = || OdsError::RangeAddressError(address.to_owned());
    let parts = split_unquoted(address.trim(), ':');
    let (start, end) = match parts.as_slice() {
        [start] => (*start, *start),
        [start, end] => (*start, *end),
        _ => Err(error())?,
    };
    let (sheet_name, start) = start.rsplit_once('.').ok_or_else(error)?;
    let end = end.rsplit_once('.').map(|(_, cell)| cell).unwrap_or(end);
    let sheet_name = unquote_sheet_name(sheet_name);
    if sheet_name.is_empty() || start.is_empty() || end.is_empty() {
        Err(error())?;
    }
    let range = Range::try_from(format!("{start}:{end}").as_str())
        .map_err(|_| error())?;
    Ok((sheet_name, range))
}

/// Splits on a separator that is not inside a single-quoted sheet name
fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut is_quoted = false;
    let mut start = 0usize;
    for (index, character) in value.char_indices() {
        if character == '\'' {
            is_quoted = !is_quoted;
        } else if character == separator && !is_quoted {
            parts.push(&value[start..index]);
            start = index + character.len_utf8();
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Removes the absolute marker and quotes from a sheet name (`$'It''s'` → `It's`)
fn unquote_sheet_name(value: &str) -> String {
    let value = value.strip_prefix('$').unwrap_or(value);
    match value.strip_prefix('\'').and_then(|it| it.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => value.to_owned(),
    }
}
