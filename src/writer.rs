//! Framing and writing WARC records.
//!
//! Records are serialised with the `warc` crate, one at a time, into the
//! currently open output file. In gzip mode every record is its own gzip
//! member, so a reader can seek to any record offset and decompress it
//! on its own.

pub mod archive_record;
mod output_file;
pub mod writing_errors;

pub use output_file::{RolloverWriter, WrittenRecord};

use crate::config::ConfigError;
use libflate::gzip::Encoder;
use std::{fmt, io::Write as _, str::FromStr};
use warc::{BufferedBody, Record, WarcWriter};
use writing_errors::WritingError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    None,
    #[default]
    Gzip,
}
impl Compression {
    /// # Serialise a record
    ///
    /// Frames the record (version line, named headers, blank line,
    /// content block, trailing blank line) and compresses it when
    /// required. The returned bytes are exactly what lands in the file.
    ///
    /// # Errors
    ///
    /// Returns `WritingError::Serialise` if framing or compression fails.
    pub fn serialise(self, record: &Record<BufferedBody>) -> Result<Vec<u8>, WritingError> {
        let mut framed = Vec::with_capacity(record.body().len() + 1024);
        {
            let mut warc_writer = WarcWriter::new(&mut framed);
            warc_writer.write(record).map_err(WritingError::Serialise)?;
        }
        match self {
            Self::None => return Ok(framed),
            Self::Gzip => {
                let mut encoder = Encoder::new(Vec::with_capacity(framed.len() / 2))
                    .map_err(WritingError::Serialise)?;
                encoder.write_all(&framed).map_err(WritingError::Serialise)?;
                return encoder.finish().into_result().map_err(WritingError::Serialise);
            }
        }
    }
}
impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.to_ascii_lowercase().as_str() {
            "none" => return Ok(Self::None),
            "gzip" => return Ok(Self::Gzip),
            _ => return Err(ConfigError::UnknownCompression(mode.to_owned())),
        }
    }
}
impl fmt::Display for Compression {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => return write!(message, "none"),
            Self::Gzip => return write!(message, "gzip"),
        }
    }
}
