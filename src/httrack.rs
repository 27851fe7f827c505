//! Readers for the files HTTrack leaves behind in a mirror directory.
//!
//! HTTrack writes its logs in ISO-8859-1 and formats dates in English
//! regardless of the host locale, so both parsers decode bytes one-to-one
//! into chars and share [`parse_hts_date`].

mod cache_parser;
mod log_parser;
pub mod parsing_errors;

pub use cache_parser::{CacheParser, CrawlRecord};
pub use log_parser::CrawlLog;

use chrono::NaiveDateTime;
use parsing_errors::ParseError;
use std::io::{self, BufRead};

/// The date grammar used by `hts-log.txt` and `hts-cache/new.txt`,
/// for example `Mon, 01 Jan 2024 00:00:00`.
pub const HTS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// # Parse an HTTrack date
///
/// The result is a naive local time, HTTrack does not record the
/// timezone of the machine it ran on.
///
/// # Errors
///
/// Returns `ParseError::InvalidDate` if the value does not follow
/// [`HTS_DATE_FORMAT`].
pub fn parse_hts_date(value: &str) -> Result<NaiveDateTime, ParseError> {
    match NaiveDateTime::parse_from_str(value.trim(), HTS_DATE_FORMAT) {
        Ok(date) => return Ok(date),
        Err(source) => {
            return Err(ParseError::InvalidDate {
                value: value.to_owned(),
                source,
            });
        }
    }
}

/// Decode ISO-8859-1 bytes, every byte maps to the char with the same value.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    return bytes.iter().map(|byte| return char::from(*byte)).collect();
}

/// Encode text back to ISO-8859-1, chars outside the range become `?`.
#[must_use]
pub fn encode_latin1(text: &str) -> Vec<u8> {
    return text
        .chars()
        .map(|character| return u8::try_from(u32::from(character)).unwrap_or(b'?'))
        .collect();
}

/// Read one line and decode it, without the trailing `\n` or `\r\n`.
/// Returns `None` at the end of the stream.
pub(crate) fn read_latin1_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line_buffer = Vec::with_capacity(256);
    if reader.read_until(b'\n', &mut line_buffer)? == 0 {
        return Ok(None);
    }
    while line_buffer.last().is_some_and(|byte| return *byte == b'\n' || *byte == b'\r') {
        line_buffer.pop();
    }
    return Ok(Some(decode_latin1(&line_buffer)));
}
