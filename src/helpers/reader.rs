use crate::error::SheetRecordsError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub(crate) enum UnifiedReaderError {
    #[error("No data from remote file: '{0}'")]
    RemoteFileNoDataError(String),
}

/// A unified reader over a local file or a remote file fetched into memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Remote URL reader (in-memory buffer)
    Remote(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a file from either a local path or remote URL.
    /// Remote files are fetched through DuckDB's `read_blob`, which handles
    /// protocols (http, https, s3, gs, ...) and credentials.
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, SheetRecordsError> {
        if Self::is_remote_url(file_name) {
            Self::read_blob_with_duckdb(file_name)
        } else {
            let file = File::open(file_name)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Checks if a file name represents a remote URL
    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        Url::parse(file_name)
            .map(|url| url.scheme() != "file" && url.scheme().len() > 1)
            .unwrap_or(false)
    }

    /// Returns the lower-cased file extension, ignoring URL query strings and fragments
    pub(crate) fn extension(file_name: &str) -> Option<String> {
        let path = match Url::parse(file_name) {
            Ok(url) if Self::is_remote_url(file_name) => url.path().to_owned(),
            _ => file_name.to_owned(),
        };
        Path::new(&path)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_ascii_lowercase())
    }

    fn read_blob_with_duckdb(file_name: &str) -> Result<UnifiedReader, SheetRecordsError> {
        debug!(file = file_name, "fetching remote spreadsheet");
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [file_name], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(file_name.to_owned()))?;
        }
        debug!(file = file_name, bytes = bytes.len(), "fetched remote spreadsheet");
        Ok(UnifiedReader::Remote(Cursor::new(bytes)))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Remote(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Remote(reader) => reader.seek(pos),
        }
    }
}
