use crate::spreadsheet::range::Range;

/// A data table declared on a sheet (an Excel table part or an ODS database range).
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Table {
    /// Table name as shown to users
    pub(crate) name: String,
    /// Cells covered by the table, header and totals rows included
    pub(crate) range: Range,
}
