use crate::spreadsheet::range::Range;
use glob::Pattern;

/// Criteria for locating the block of cells to convert.
#[derive(Clone, Debug, Default)]
pub(crate) struct Criteria {
    /// Sheet name pattern; the first matching sheet is used.
    pub(crate) sheet_name_pattern: Option<Pattern>,

    /// Name of the table to read instead of the sheet's first table.
    pub(crate) table_name: Option<String>,

    /// Explicit data range; takes precedence over tables.
    pub(crate) range: Option<Range>,
}

impl Criteria {
    /// Checks if a sheet name matches the criteria pattern.
    /// Returns true if no pattern is specified.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_pattern
            .as_ref()
            .map(|pattern| pattern.matches(sheet_name))
            .unwrap_or(true)
    }

    /// Checks if a table name matches the requested table (case-insensitive).
    pub(crate) fn accept_table(&self, table_name: &str) -> bool {
        self.table_name
            .as_ref()
            .map(|name| name.eq_ignore_ascii_case(table_name))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_everything_by_default() {
        let criteria = Criteria::default();
        assert!(criteria.accept("Sheet1"));
        assert!(criteria.accept_table("Table1"));
    }

    #[test]
    fn accept_matching_names() {
        let criteria = Criteria {
            sheet_name_pattern: Some(Pattern::new("Data*").unwrap()),
            table_name: Some("variables".to_owned()),
            range: None,
        };
        assert!(criteria.accept("Data 2024"));
        assert!(!criteria.accept("Summary"));
        assert!(criteria.accept_table("Variables"));
        assert!(!criteria.accept_table("Variables2"));
    }
}
