use std::{error::Error, fmt};
use warc::RecordType;

#[derive(Debug)]
pub enum IndexingError {
    /// Only `response`, `resource` and `revisit` records are indexed.
    UnindexableRecordType(RecordType),
    ValueNotFound(String),
    RecordUrlError(url::ParseError),
    TimestampError(chrono::ParseError),
    HttpParseError(httparse::Error),
    JsonError(serde_json::Error),
    WriteError(std::io::Error),
}
impl fmt::Display for IndexingError {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnindexableRecordType(record_type) => {
                return write!(message, "cannot index a {record_type:?} record");
            }
            Self::ValueNotFound(error_message) => {
                return write!(message, "value not found: {error_message}");
            }
            Self::RecordUrlError(error_message) => {
                return write!(message, "could not parse record url: {error_message}");
            }
            Self::TimestampError(error_message) => {
                return write!(message, "could not parse record date: {error_message}");
            }
            Self::HttpParseError(error_message) => {
                return write!(message, "could not parse HTTP headers: {error_message}");
            }
            Self::JsonError(error_message) => {
                return write!(message, "could not serialise index line: {error_message}");
            }
            Self::WriteError(error_message) => {
                return write!(message, "could not write index: {error_message}");
            }
        }
    }
}
impl Error for IndexingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RecordUrlError(url_error) => return Some(url_error),
            Self::TimestampError(chrono_error) => return Some(chrono_error),
            Self::HttpParseError(httparse_error) => return Some(httparse_error),
            Self::JsonError(json_error) => return Some(json_error),
            Self::WriteError(io_error) => return Some(io_error),
            Self::UnindexableRecordType(_) | Self::ValueNotFound(_) => return None,
        }
    }
}
