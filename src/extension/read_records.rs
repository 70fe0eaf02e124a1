use crate::error::ResultMessage;
use crate::error::SheetRecordsError;
use crate::extension::load_records;
use crate::extension::ExtensionError;
use crate::extension::FileParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::RangeParam;
use crate::extension::SheetParam;
use crate::extension::SheetParameters;
use crate::extension::StrictParam;
use crate::extension::TableParam;
use crate::mapping::Record;
use duckdb::core::DataChunkHandle;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::collections::HashSet;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use tracing::info;

/// Rows emitted per output chunk (DuckDB's standard vector size)
const BATCH_SIZE: usize = 2048;

#[repr(C)]
/// Bind data of `read_records`: the mapped records and their field names
pub(crate) struct ReadRecordsBindData {
    /// Field names backing each output column, in header order
    field_names: Vec<String>,
    /// Records in row order
    records: Vec<Record>,
}

impl TryFrom<&SheetParameters> for ReadRecordsBindData {
    type Error = SheetRecordsError;

    /// Reads the spreadsheet block and maps it to records.
    /// A block without a header row cannot declare any output column.
    fn try_from(parameters: &SheetParameters) -> Result<Self, Self::Error> {
        let loaded = load_records(parameters)?;
        if loaded.field_names.is_empty() {
            Err(ExtensionError::NoFieldNames(loaded.sheet_name.to_owned()))?;
        }
        info!(
            file = parameters.file_name.as_str(),
            sheet = loaded.sheet_name.as_str(),
            records = loaded.records.len(),
            "read records"
        );
        Ok(ReadRecordsBindData {
            field_names: loaded.field_names,
            records: loaded.records,
        })
    }
}

#[repr(C)]
/// Initialization data tracking the next record to emit
pub(crate) struct ReadRecordsInitData {
    /// Offset of the next batch
    offset: AtomicUsize,
    /// Column indices that should be projected (output) from the records
    projections: Vec<usize>,
}

/// Table function returning one row per record and one VARCHAR column per field name.
pub(crate) struct ReadRecordsTableFunction;

impl VTab for ReadRecordsTableFunction {
    type InitData = ReadRecordsInitData;
    type BindData = ReadRecordsBindData;

    /// Binds the table function by reading the spreadsheet and declaring one
    /// column per distinct field name.
    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = SheetParameters::try_from(bind)?;
        let data = ReadRecordsBindData::try_from(&parameters).with_prefix(parameters.file_name.as_str())?;
        for column_name in to_column_names(&data.field_names) {
            bind.add_result_column(column_name.as_str(), LogicalTypeHandle::from(LogicalTypeId::Varchar));
        }
        Ok(data)
    }

    fn init(init: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        let projections = init.get_column_indices()
            .into_iter()
            .map(|index| index as usize)
            .collect::<Vec<_>>();
        Ok(ReadRecordsInitData {
            offset: AtomicUsize::new(0),
            projections,
        })
    }

    /// Emits the next batch of records; a key missing from a record becomes NULL.
    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        let offset = init.offset.fetch_add(BATCH_SIZE, Ordering::Relaxed);
        if offset >= bind.records.len() {
            // No more data to process
            output.set_len(0);
            return Ok(());
        }

        let batch = &bind.records[offset..bind.records.len().min(offset + BATCH_SIZE)];
        let mut vectors: Vec<_> = (0..init.projections.len()).map(|index| output.flat_vector(index)).collect();
        for (row, record) in batch.iter().enumerate() {
            for (index, col) in init.projections.iter().enumerate() {
                let vector = &mut vectors[index];
                match bind.field_names.get(*col).and_then(|name| record.get(name)) {
                    Some(value) => vector.insert(row, value),
                    None => vector.set_null(row),
                }
            }
        }
        output.set_len(batch.len());
        Ok(())
    }

    /// Enables projection pushdown so unused columns are never written.
    fn supports_pushdown() -> bool {
        true
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            FileParam::kind(),
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            SheetParam::definition(),
            TableParam::definition(),
            RangeParam::definition(),
            StrictParam::definition(),
        ])
    }
}

/// Turns field names into column names DuckDB accepts.
///
/// Column names are unique ignoring case and never empty, while record keys
/// are compared exactly: `Name` and `name` are two fields but need two
/// distinct columns (`Name`, `name_1`), and an empty header becomes `column{n}`.
fn to_column_names(field_names: &[String]) -> Vec<String> {
    let mut seen = HashSet::<String>::new();
    field_names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.trim().is_empty() {
                format!("column{}", index + 1)
            } else {
                name.to_owned()
            };
            let mut column_name = base.to_owned();
            let mut suffix = 0usize;
            while !seen.insert(column_name.to_lowercase()) {
                suffix += 1;
                column_name = format!("{base}_{suffix}");
            }
            column_name
        })
        .collect()
}
