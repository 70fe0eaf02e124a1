//! # DuckDB Sheet Records Extension
//!
//! Turns a spreadsheet block whose first row holds field names into records
//! keyed by those names, and exposes them to SQL.
//!
//! ## Features
//!
//! - **Record mapping**: every row after the header becomes an ordered
//!   `field name → cell text` record ([`mapping`]).
//! - **Multi-format support**: Excel workbooks (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`, `.xlam`)
//!   and OpenDocument spreadsheets (`.ods`), local or remote.
//! - **Table discovery**: explicit ranges, named tables (Excel table parts,
//!   ODS database ranges) or the used range of a sheet.
//! - **Display text**: cells are read the way a spreadsheet shows them,
//!   dates and times included.
//!
//! ## Table Functions
//!
//! - `read_records`: one row per record, one VARCHAR column per field name
//! - `sheet_to_json`: the records of a sheet as a single JSON array
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod error;
mod extension;
mod helpers;
pub mod mapping;
mod spreadsheet;

use crate::extension::read_records::ReadRecordsTableFunction;
use crate::extension::sheet_to_json::SheetToJsonTableFunction;
use anyhow::Context;
use anyhow::Result;
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;

/// Extension entry point for DuckDB.
///
/// Registers the `read_records` and `sheet_to_json` table functions.
///
/// # Errors
///
/// Returns an error if either table function fails to register with DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    connection
        .register_table_function::<ReadRecordsTableFunction>("read_records")
        .context("Failed to register read_records table function")?;
    connection
        .register_table_function::<SheetToJsonTableFunction>("sheet_to_json")
        .context("Failed to register sheet_to_json table function")?;
    Ok(())
}
