use crate::error::ResultMessage;
use crate::error::SheetRecordsError;
use crate::extension::load_records;
use crate::extension::FileParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::PrettyParam;
use crate::extension::RangeParam;
use crate::extension::SheetParam;
use crate::extension::SheetParameters;
use crate::extension::StrictParam;
use crate::extension::TableParam;
use crate::mapping::to_json;
use duckdb::core::DataChunkHandle;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tracing::info;

/// Name of the single output column
const JSON_COLUMN: &str = "json";

#[repr(C)]
/// Bind data of `sheet_to_json`: the rendered JSON array
pub(crate) struct SheetToJsonBindData {
    json: String,
}

impl SheetToJsonBindData {
    /// Maps the selected block to records and renders them as one JSON array.
    /// An empty block renders as `[]`.
    fn load(parameters: &SheetParameters, pretty: bool) -> Result<Self, SheetRecordsError> {
        let loaded = load_records(parameters)?;
        let json = to_json(&loaded.records, pretty)?;
        info!(
            file = parameters.file_name.as_str(),
            sheet = loaded.sheet_name.as_str(),
            records = loaded.records.len(),
            "{json}"
        );
        Ok(SheetToJsonBindData { json })
    }
}

#[repr(C)]
pub(crate) struct SheetToJsonInitData {
    /// Set once the single row has been emitted
    done: AtomicBool,
}

/// Table function returning the records of a sheet as one JSON array.
pub(crate) struct SheetToJsonTableFunction;

impl VTab for SheetToJsonTableFunction {
    type InitData = SheetToJsonInitData;
    type BindData = SheetToJsonBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = SheetParameters::try_from(bind)?;
        let pretty = PrettyParam::read(bind)?.unwrap_or(false);
        let data = SheetToJsonBindData::load(&parameters, pretty).with_prefix(parameters.file_name.as_str())?;
        bind.add_result_column(JSON_COLUMN, LogicalTypeHandle::from(LogicalTypeId::Varchar));
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(SheetToJsonInitData {
            done: AtomicBool::new(false),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        if init.done.swap(true, Ordering::Relaxed) {
            output.set_len(0);
        } else {
            output.flat_vector(0).insert(0, bind.json.as_str());
            output.set_len(1);
        }
        Ok(())
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
            PrettyParam::definition(),
        ])
    }
}
