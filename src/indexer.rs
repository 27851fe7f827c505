//! CDXJ index of the records a conversion writes.
//!
//! Each indexed record becomes one line:
//!
//! ```text
//! org,example)/page.html 20240101000000 {"url":"http://example.org/page.html","digest":"sha256:…","mime":"text/html","offset":312,"length":1024,"status":200,"filename":"crawl-0.warc.gz"}
//! ```

mod index_line;
pub mod indexing_errors;
mod target_url;

pub use index_line::IndexLine;
pub use target_url::TargetUrl;

use chrono::{DateTime, FixedOffset, Utc};
use indexing_errors::IndexingError;
use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};
use warc::{BufferedBody, Record, WarcHeader};

/// The `WARC-Date` of a record.
pub struct RecordTimestamp(DateTime<FixedOffset>);
impl RecordTimestamp {
    /// # Errors
    ///
    /// Returns `ValueNotFound` if the record has no date, or
    /// `TimestampError` if it is not RFC 3339.
    pub fn new(record: &Record<BufferedBody>) -> Result<Self, IndexingError> {
        let Some(date) = record.header(WarcHeader::Date) else {
            return Err(IndexingError::ValueNotFound(
                "Date not present in the WARC header".to_owned(),
            ));
        };
        match DateTime::parse_from_rfc3339(&date) {
            Ok(timestamp) => return Ok(Self(timestamp)),
            Err(parse_error) => return Err(IndexingError::TimestampError(parse_error)),
        }
    }
}
/// Fourteen digit UTC timestamp, `yyyyMMddHHmmss`.
impl fmt::Display for RecordTimestamp {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(
            message,
            "{}",
            self.0.with_timezone(&Utc).format("%Y%m%d%H%M%S")
        );
    }
}

/// Appends CDXJ lines to an index file as records are written.
pub struct IndexWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: usize,
}
impl IndexWriter {
    /// # Errors
    ///
    /// Returns `WriteError` if the index file cannot be created.
    pub fn create(path: &Path) -> Result<Self, IndexingError> {
        let file = File::create(path).map_err(IndexingError::WriteError)?;
        return Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            lines_written: 0,
        });
    }

    /// # Errors
    ///
    /// Returns `JsonError` or `WriteError` if the line cannot be
    /// serialised or written.
    pub fn append(&mut self, line: &IndexLine) -> Result<(), IndexingError> {
        let cdxj_line = line.to_cdxj_string()?;
        writeln!(self.writer, "{cdxj_line}").map_err(IndexingError::WriteError)?;
        self.lines_written += 1;
        return Ok(());
    }

    #[must_use]
    pub const fn lines_written(&self) -> usize {
        return self.lines_written;
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// # Errors
    ///
    /// Returns `WriteError` if buffered lines cannot be flushed.
    pub fn flush(&mut self) -> Result<(), IndexingError> {
        return self.writer.flush().map_err(IndexingError::WriteError);
    }
}
