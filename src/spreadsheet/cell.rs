use crate::error::SheetRecordsError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use iso8601_duration::Duration as IsoDuration;

const MILLISECONDS_PER_DAY: i64 = 86_400_000;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Text already in display form (shared, inline and formula strings)
    Text,
    /// Error literals such as `#N/A`
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Represents a single cell in a spreadsheet with position, type, and value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Renders the cell the way a spreadsheet application displays it.
    pub(crate) fn to_text(&self) -> Result<String, SheetRecordsError> {
        let text = match self.kind {
            CellType::Empty => String::new(),
            CellType::Boolean => if self.value == "1" || self.value.eq_ignore_ascii_case("true") { "TRUE" } else { "FALSE" }.to_owned(),
            CellType::Number => to_number_string(&self.value),
            CellType::NumberDateTime1900 => to_datetime_string(self.serial()?, false).ok_or_else(|| self.value_error("out of the date range"))?,
            CellType::NumberDateTime1904 => to_datetime_string(self.serial()?, true).ok_or_else(|| self.value_error("out of the date range"))?,
            CellType::NumberDate1900 => to_date_string(self.serial()?, false).ok_or_else(|| self.value_error("out of the date range"))?,
            CellType::NumberDate1904 => to_date_string(self.serial()?, true).ok_or_else(|| self.value_error("out of the date range"))?,
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(self.serial()?),
            CellType::IsoDateTime => self.value.replace('T', " "),
            CellType::IsoDuration => to_duration_string(&self.value).ok_or_else(|| self.value_error("not an ISO 8601 duration"))?,
            CellType::Text | CellType::Error => self.value.to_owned(),
        };
        Ok(text)
    }

    /// Parses the stored value as a date serial number.
    fn serial(&self) -> Result<f64, SheetRecordsError> {
        self.value
            .parse::<f64>()
            .ok()
            .filter(|serial| serial.is_finite())
            .ok_or_else(|| self.value_error("not a date serial number"))
    }

    fn value_error(&self, message: &str) -> SheetRecordsError {
        SpreadsheetError::CellValueError(self.reference(), format!("'{}' is {}", self.value, message)).into()
    }
}

/// Formats a stored number with the shortest representation that round-trips.
/// Very large and very small magnitudes use the scientific form of the
/// General format (`1E+21`, `1.5E-07`).
fn to_number_string(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && number != 0.0 && (number.abs() >= 1e21 || number.abs() < 1e-6) => to_scientific_string(number),
        Ok(number) if number.is_finite() => number.to_string(),
        _ => value.to_owned(),
    }
}

fn to_scientific_string(number: f64) -> String {
    let text = format!("{number:E}");
    match text.split_once('E') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}E{sign}{digits:0>2}")
        }
        None => text,
    }
}

/// Splits a serial number into whole days and milliseconds since midnight.
fn split_serial(serial: f64) -> (i64, i64) {
    let milliseconds = (serial * MILLISECONDS_PER_DAY as f64).round() as i64;
    (
        milliseconds.div_euclid(MILLISECONDS_PER_DAY),
        milliseconds.rem_euclid(MILLISECONDS_PER_DAY),
    )
}

/// Converts a serial day number to a calendar date.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
/// Returns None when the date falls outside the calendar chrono supports.
fn to_date(days: i64, is_1904: bool) -> Option<NaiveDate> {
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let delta = Duration::try_days(days.checked_add(offset)?)?;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(delta)
}

fn to_date_string(serial: f64, is_1904: bool) -> Option<String> {
    let (days, _) = split_serial(serial);
    Some(to_date(days, is_1904)?.format("%Y-%m-%d").to_string())
}

/// Converts the fractional part of a serial number to a clock time.
fn to_time_string(serial: f64) -> String {
    let (_, milliseconds) = split_serial(serial);
    format_clock(milliseconds)
}

fn to_datetime_string(serial: f64, is_1904: bool) -> Option<String> {
    let (days, milliseconds) = split_serial(serial);
    Some(format!("{} {}", to_date(days, is_1904)?.format("%Y-%m-%d"), format_clock(milliseconds)))
}

fn format_clock(milliseconds: i64) -> String {
    let fraction = milliseconds % 1_000;
    let seconds = milliseconds / 1_000 % 60;
    let minutes = milliseconds / 60_000 % 60;
    let hours = milliseconds / 3_600_000;
    if fraction > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Renders an ISO 8601 duration (`PT13H45M00S`) as `13:45:00`.
fn to_duration_string(value: &str) -> Option<String> {
    let duration = value.parse::<IsoDuration>().ok()?;
    let hours = duration.day as f64 * 24.0 + duration.hour as f64;
    let seconds = (hours * 60.0 + duration.minute as f64) * 60.0 + duration.second as f64;
    Some(format_clock((seconds * 1_000.0).round() as i64))
}
