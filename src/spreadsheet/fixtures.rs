//! Small workbooks built on the fly for reader tests
use std::io::Cursor;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const SPREADSHEETML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Routes `tracing` output to the test harness
pub(crate) fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sheet_records=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub(crate) fn path(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

/// Writes the entries into a zip package with the given file suffix
pub(crate) fn write_package(suffix: &str, entries: &[(String, String)]) -> NamedTempFile {
    let mut buffer = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in entries {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    let file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.reopen().unwrap().write_all(&buffer).unwrap();
    file
}

/// Worksheet of a generated workbook
pub(crate) struct XlsxSheet<'a> {
    pub(crate) name: &'a str,
    /// Content of `sheetData`
    pub(crate) rows: String,
    /// Tables as (display name, reference)
    pub(crate) tables: &'a [(&'a str, &'a str)],
}

/// Inline string cell
pub(crate) fn text(reference: &str, value: &str) -> String {
    format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)
}

/// Shared string cell
pub(crate) fn shared(reference: &str, index: usize) -> String {
    format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#)
}

/// Numeric cell with an optional style index
pub(crate) fn number(reference: &str, value: &str, style: Option<usize>) -> String {
    match style {
        Some(style) => format!(r#"<c r="{reference}" s="{style}"><v>{value}</v></c>"#),
        None => format!(r#"<c r="{reference}"><v>{value}</v></c>"#),
    }
}

pub(crate) fn row(number: usize, cells: &[String]) -> String {
    format!(r#"<row r="{number}">{}</row>"#, cells.concat())
}

/// Builds an xlsx package
///
/// Style indexes: 0 general, 1 date (id 14), 2 custom time `hh:mm:ss`, 3 date time (id 22).
pub(crate) fn xlsx(sheets: &[XlsxSheet], shared_strings: &[&str], is_1904: bool) -> NamedTempFile {
    let mut entries = Vec::<(String, String)>::new();
    let mut workbook_sheets = String::new();
    let mut workbook_relationships = String::new();
    let mut table_number = 0usize;
    for (index, sheet) in sheets.iter().enumerate() {
        let number = index + 1;
        workbook_sheets.push_str(&format!(r#"<sheet name="{}" sheetId="{number}" r:id="rId{number}"/>"#, sheet.name));
        workbook_relationships.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="{RELATIONSHIPS}/worksheet" Target="worksheets/sheet{number}.xml"/>"#
        ));

        let mut table_parts = String::new();
        let mut sheet_relationships = String::new();
        for (offset, (name, reference)) in sheet.tables.iter().enumerate() {
            table_number += 1;
            let id = offset + 1;
            table_parts.push_str(&format!(r#"<tablePart r:id="rId{id}"/>"#));
            sheet_relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="{RELATIONSHIPS}/table" Target="../tables/table{table_number}.xml"/>"#
            ));
            entries.push((
                format!("xl/tables/table{table_number}.xml"),
                format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><table xmlns="{SPREADSHEETML}" id="{table_number}" name="Table{table_number}" displayName="{name}" ref="{reference}"><autoFilter ref="{reference}"/></table>"#),
            ));
        }
        if !sheet.tables.is_empty() {
            table_parts = format!(r#"<tableParts count="{}">{table_parts}</tableParts>"#, sheet.tables.len());
            entries.push((
                format!("xl/worksheets/_rels/sheet{number}.xml.rels"),
                format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIPS}">{sheet_relationships}</Relationships>"#),
            ));
        }
        entries.push((
            format!("xl/worksheets/sheet{number}.xml"),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{SPREADSHEETML}" xmlns:r="{RELATIONSHIPS}"><sheetData>{}</sheetData>{table_parts}</worksheet>"#, sheet.rows),
        ));
    }
    workbook_relationships.push_str(&format!(
        r#"<Relationship Id="rIdStyles" Type="{RELATIONSHIPS}/styles" Target="styles.xml"/><Relationship Id="rIdStrings" Type="{RELATIONSHIPS}/sharedStrings" Target="/xl/sharedStrings.xml"/>"#
    ));

    let date1904 = if is_1904 { "1" } else { "0" };
    entries.push((
        "xl/workbook.xml".to_owned(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{SPREADSHEETML}" xmlns:r="{RELATIONSHIPS}"><workbookPr date1904="{date1904}"/><sheets>{workbook_sheets}</sheets></workbook>"#),
    ));
    entries.push((
        "xl/_rels/workbook.xml.rels".to_owned(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIPS}">{workbook_relationships}</Relationships>"#),
    ));
    entries.push((
        "xl/styles.xml".to_owned(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{SPREADSHEETML}"><numFmts count="1"><numFmt numFmtId="164" formatCode="hh:mm:ss"/></numFmts><cellStyleXfs count="1"><xf numFmtId="49"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" xfId="0"/><xf numFmtId="14" xfId="0" applyNumberFormat="1"/><xf numFmtId="164" xfId="0" applyNumberFormat="1"/><xf numFmtId="22" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#),
    ));
    let items: String = shared_strings.iter().map(|item| {
        if item.starts_with("<") {
            format!("<si>{item}</si>")
        } else {
            format!("<si><t>{item}</t></si>")
        }
    }).collect();
    entries.push((
        "xl/sharedStrings.xml".to_owned(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{SPREADSHEETML}" count="{0}" uniqueCount="{0}">{items}</sst>"#, shared_strings.len()),
    ));
    write_package(".xlsx", &entries)
}

/// Workbook whose first sheet lists variables, with a second unrelated sheet
pub(crate) fn variables_xlsx() -> NamedTempFile {
    let shared_strings = [
        "PFF_VARIABLE",
        "DOMAIN",
        "NOTES",
        "pff_001",
        "Income",
        "pff_002",
        "<r><t>Exp</t></r><r><t>enses</t></r><rPh sb=\"0\" eb=\"3\"><t>ekusupensu</t></rPh>",
    ];
    let rows = [
        row(1, &[shared("A1", 0), shared("B1", 1), shared("C1", 2)]),
        row(2, &[shared("A2", 3), shared("B2", 4)]),
        row(3, &[shared("A3", 5), shared("B3", 6), text("C3", "Calculated")]),
    ].concat();
    xlsx(&[
        XlsxSheet { name: "Variables", rows, tables: &[] },
        XlsxSheet { name: "Notes", rows: row(1, &[text("A1", "unused")]), tables: &[] },
    ], &shared_strings, false)
}

/// Workbook with one header row and one row of typed cells
pub(crate) fn typed_xlsx(is_1904: bool) -> NamedTempFile {
    let rows = [
        row(1, &[
            r#"<c r="A1" t="str"><f>"name"</f><v>name</v></c>"#.to_owned(),
            text("B1", "age"),
            text("C1", "active"),
            text("D1", "joined"),
            text("E1", "start"),
            text("F1", "ratio"),
            text("G1", "error"),
        ]),
        row(2, &[
            text("A2", "Alice"),
            number("B2", "30", None),
            r#"<c r="C2" t="b"><v>1</v></c>"#.to_owned(),
            number("D2", "45322", Some(1)),
            number("E2", "0.5729166666666666", Some(2)),
            number("F2", "3.1400000000000001", Some(0)),
            r#"<c r="G2" t="e"><f>NA()</f><v>#N/A</v></c>"#.to_owned(),
        ]),
    ].concat();
    xlsx(&[XlsxSheet { name: "Types", rows, tables: &[] }], &[], is_1904)
}

/// Workbook with two tables on `Data` and one on `Catalog`
pub(crate) fn tables_xlsx() -> NamedTempFile {
    let data = [
        row(1, &[text("A1", "region"), text("B1", "code"), text("D1", "note"), text("F1", "city")]),
        row(2, &[text("A2", "North"), text("B2", "N"), text("D2", "free text"), text("F2", "Oslo")]),
    ].concat();
    let catalog = [
        row(1, &[text("A1", "sku"), text("B1", "price")]),
        row(2, &[text("A2", "A-1"), number("B2", "9.5", None)]),
        row(3, &[text("A3", "B-2"), number("B3", "12", None)]),
        row(5, &[text("A5", "outside")]),
    ].concat();
    xlsx(&[
        XlsxSheet { name: "Data", rows: data, tables: &[("Regions", "A1:B2"), ("Cities", "F1:F2")] },
        XlsxSheet { name: "Catalog", rows: catalog, tables: &[("Products", "A1:B3")] },
    ], &[], false)
}

fn ods_text(value: &str) -> String {
    format!(r#"<table:table-cell office:value-type="string" calcext:value-type="string"><text:p>{value}</text:p></table:table-cell>"#)
}

fn ods_row(cells: &[String]) -> String {
    format!("<table:table-row>{}</table:table-row>", cells.concat())
}

/// OpenDocument spreadsheet with `Variables` and `Values` sheets, and a `Lookup`
/// sheet holding a named database range; `is_encrypted` marks the content as
/// encrypted in the manifest
pub(crate) fn variables_ods(is_encrypted: bool) -> NamedTempFile {
    let empty = "<table:table-cell/>".to_owned();
    let variables = [
        ods_row(&[ods_text("PFF_VARIABLE"), ods_text("DOMAIN"), ods_text("NOTES"), ods_text("CHECKED")]),
        ods_row(&[
            ods_text("pff_001"),
            ods_text("Income"),
            empty.to_owned(),
            r#"<table:table-cell office:value-type="boolean" office:boolean-value="true"><text:p>TRUE</text:p></table:table-cell>"#.to_owned(),
        ]),
        ods_row(&[
            ods_text("pff_002"),
            ods_text("Expenses"),
            r#"<table:table-cell office:value-type="string"><office:annotation><text:p>reviewer comment</text:p></office:annotation><text:p>multi</text:p><text:p>line</text:p></table:table-cell>"#.to_owned(),
            r#"<table:table-cell office:value-type="boolean" office:boolean-value="false"/>"#.to_owned(),
        ]),
        ods_row(&[
            ods_text("pff_003"),
            ods_text("Expenses"),
            empty.to_owned(),
            r#"<table:table-cell office:value-type="boolean" office:boolean-value="false"><text:p>FALSE</text:p></table:table-cell>"#.to_owned(),
        ]),
        r#"<table:table-row table:number-rows-repeated="1048572"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>"#.to_owned(),
    ].concat();
    let values = [
        ods_row(&[ods_text("when"), ods_text("duration"), ods_text("amount")]),
        ods_row(&[
            r#"<table:table-cell office:value-type="date" office:date-value="2024-01-31T08:30:00"/>"#.to_owned(),
            r#"<table:table-cell office:value-type="time" office:time-value="PT13H45M00S"/>"#.to_owned(),
            r#"<table:table-cell office:value-type="float" office:value="30"/>"#.to_owned(),
        ]),
    ].concat();
    let lookup = [
        ods_row(&[ods_text("DOMAIN")]),
        ods_row(&[ods_text("Income")]),
        ods_row(&[ods_text("Expenses")]),
        "<table:table-row><table:table-cell/></table:table-row>".to_owned(),
        ods_row(&[ods_text("(end)")]),
    ].concat();
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0" office:version="1.3"><office:body><office:spreadsheet><table:table table:name="Variables"><table:table-column table:number-columns-repeated="4"/>{variables}</table:table><table:table table:name="Values">{values}</table:table><table:table table:name="Lookup">{lookup}</table:table><table:database-ranges><table:database-range table:name="Domains" table:target-range-address="$Lookup.$A$1:.$A$3"/><table:database-range table:name="__Anonymous_Sheet_DB__0" table:target-range-address="Values.A1:Values.C2"/></table:database-ranges></office:spreadsheet></office:body></office:document-content>"#
    );
    let encryption = if is_encrypted {
        r#"<manifest:encryption-data manifest:checksum-type="SHA1/1K" manifest:checksum="AAAA"/>"#
    } else {
        ""
    };
    let manifest = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.3"><manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/><manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml">{encryption}</manifest:file-entry></manifest:manifest>"#
    );
    write_package(".ods", &[
        ("mimetype".to_owned(), "application/vnd.oasis.opendocument.spreadsheet".to_owned()),
        ("META-INF/manifest.xml".to_owned(), manifest),
        ("content.xml".to_owned(), content),
    ])
}
