//! Microsoft Office Open XML package helpers
use crate::error::SheetRecordsError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Relationship type suffix of worksheet parts
pub(super) const RELATIONSHIP_WORKSHEET: &str = "/worksheet";
/// Relationship type suffix of table parts
pub(super) const RELATIONSHIP_TABLE: &str = "/table";

/// Opens an Excel package and loads its workbook structure
///
/// # Arguments
/// * `file_name` - Path or URL of the Excel file
/// * `load_workbook` - Function to load sheet names, paths and the date system
/// * `load_number_formats` - Function to load number formatting information
///
/// # Returns
/// Tuple containing:
/// - Zip archive handle
/// - Number format mappings
/// - List of sheet names and their paths
pub(super) fn open<W, F>(file_name: &str, load_workbook: W, load_number_formats: F) -> Result<(
    ZipArchive<UnifiedReader>,
    Vec<CellType>,
    Vec<(String, String)>
), SheetRecordsError>
where
    W: Fn(&mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), SheetRecordsError>,
    F: Fn(&mut ZipArchive<UnifiedReader>, bool) -> Result<Vec<CellType>, SheetRecordsError>,
{
    let reader = UnifiedReader::new(file_name)?;
    // Encrypted workbooks are compound files, not zip packages
    let mut zip = ZipArchive::new(reader)
        .map_err(|_| SpreadsheetError::FileFormatError(file_name.to_owned()))?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
    }

    let number_formats = load_number_formats(&mut zip, is_1904)?;
    Ok((zip, number_formats, sheets))
}

/// Loads the relationships of a package part
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `part` - Path of the part whose relationships are loaded (e.g. `xl/workbook.xml`)
/// * `kind` - Suffix of the relationship type to keep (e.g. `/worksheet`)
///
/// # Returns
/// Mapping of relationship IDs to part paths; empty when the part has no relationships
pub(super) fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, part: &str, kind: &str) -> Result<HashMap<String, String>, SheetRecordsError> {
    let mut relationships: HashMap<String, String> = HashMap::new();
    let mut reader = match zip.xml_reader(&to_relationships_path(part))? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let relationship_type = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if relationship_type.map(|it| it.ends_with(kind)).unwrap_or(false) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), resolve_target(part, &target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Maps format indexes to cell types using custom and built-in formats
///
/// # Arguments
/// * `format_indexes` - List of format identifiers
/// * `custom_formats` - Custom format mappings defined in the workbook
/// * `is_1904` - Whether the workbook uses the 1904 date system
///
/// # Returns
/// Vector of cell types corresponding to each format index
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Returns the relationships part of a package part:
/// `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`
fn to_relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, name)) => format!("{directory}/_rels/{name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the directory of its source part
///
/// Absolute targets start at the package root; relative targets may climb
/// with `..` (`../tables/table1.xml`).
pub(super) fn resolve_target(part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    if let Some(absolute) = target.strip_prefix('/') {
        segments.extend(absolute.split('/'));
    } else {
        if let Some((directory, _)) = part.rsplit_once('/') {
            segments.extend(directory.split('/'));
        }
        for segment in target.split('/') {
            match segment {
                "." | "" => (),
                ".." => {
                    segments.pop();
                }
                _ => segments.push(segment),
            }
        }
    }
    segments.join("/")
}
