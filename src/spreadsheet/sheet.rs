use crate::error::ResultMessage;
use crate::error::SheetRecordsError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::range::Range;
use tracing::debug;

/// Display text of a rectangular block of cells, row by row.
pub(crate) type Grid = Vec<Vec<String>>;

/// Represents the cells read from one sheet of a spreadsheet file.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells inside the requested range
    pub(crate) cells: Vec<Cell>,
    /// Expected data range (user-specified or taken from a table)
    pub(crate) range: Range,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    /// Creates a new sheet restricted to the given range.
    pub(crate) fn new(file_name: &str, name: &str, range: Option<Range>) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            range: range.unwrap_or_default(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Checks if a row is before the lower bound of the specified range.
    pub(crate) fn before_row_lower_bound(&self, row: usize) -> bool {
        self.range.row_lower_bound
            .map(|row_lower_bound| row < row_lower_bound)
            .unwrap_or(false)
    }

    /// Checks if a row is after the upper bound of the specified range.
    pub(crate) fn after_row_upper_bound(&self, row: usize) -> bool {
        self.range.row_upper_bound
            .map(|row_upper_bound| row_upper_bound < row)
            .unwrap_or(false)
    }

    /// Checks if a column is before the lower bound of the specified range.
    pub(crate) fn before_col_lower_bound(&self, col: usize) -> bool {
        self.range.col_lower_bound
            .map(|col_lower_bound| col < col_lower_bound)
            .unwrap_or(false)
    }

    /// Checks if a column is after the upper bound of the specified range.
    pub(crate) fn after_col_upper_bound(&self, col: usize) -> bool {
        self.range.col_upper_bound
            .map(|col_upper_bound| col_upper_bound < col)
            .unwrap_or(false)
    }

    /// Checks if a cell at (row, col) is within the specified range.
    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        !self.before_row_lower_bound(row)
            && !self.after_row_upper_bound(row)
            && !self.before_col_lower_bound(col)
            && !self.after_col_upper_bound(col)
    }

    /// Adds a cell to the sheet, updating the actual data range.
    /// Cells outside the specified range are ignored.
    pub(crate) fn push(&mut self, cell: Cell) {
        if self.contains(cell.row, cell.col) {
            self.update_bound(cell.row, cell.col);
            self.cells.push(cell);
        }
    }

    /// Updates the actual data range boundaries based on cell positions.
    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|row_lower_bound| row < row_lower_bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Builds the display-text grid covering the range.
    ///
    /// Lower bounds left open by the range fall back to the actual data range.
    /// Upper bounds never reach past the last non-empty row and column, so a
    /// sheet without cells in the range yields no rows.
    /// Cells without a value become empty strings.
    pub(crate) fn to_grid(&self) -> Result<Grid, SheetRecordsError> {
        let bounds = (
            self.range.row_lower_bound.or(self.row_lower_bound),
            clamp_upper_bound(self.range.row_upper_bound, self.row_upper_bound),
            self.range.col_lower_bound.or(self.col_lower_bound),
            clamp_upper_bound(self.range.col_upper_bound, self.col_upper_bound),
        );
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = bounds else {
            return Ok(Grid::new());
        };
        if row_upper < row_lower || col_upper < col_lower {
            return Ok(Grid::new());
        }

        let mut grid = vec![vec![String::new(); col_upper - col_lower + 1]; row_upper - row_lower + 1];
        for cell in &self.cells {
            grid[cell.row - row_lower][cell.col - col_lower] = cell
                .to_text()
                .with_prefix(&format!("Sheet '{}'", self.name))?;
        }
        debug!(file = self.file_name.as_str(), sheet = self.name.as_str(), cells = self.cells.len(), "built grid");
        Ok(grid)
    }
}

/// Limits a declared upper bound to the actual one.
fn clamp_upper_bound(declared: Option<usize>, actual: Option<usize>) -> Option<usize> {
    actual.map(|actual| declared.map_or(actual, |declared| declared.min(actual)))
}
