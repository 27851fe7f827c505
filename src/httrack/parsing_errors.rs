use std::{error::Error, fmt};

/// Problems reading `hts-log.txt` or `hts-cache/new.txt`.
#[derive(Debug)]
pub enum ParseError {
    /// The log contains no non-blank line at all.
    MissingHeader,
    /// The first non-blank line is not an HTTrack launch line.
    InvalidHeader(String),
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },
    /// A line of the cache log could not be turned into a crawl record.
    InvalidCacheLine {
        line_number: usize,
        line: String,
        reason: String,
    },
    Grammar(regex::Error),
    Io(std::io::Error),
}
impl fmt::Display for ParseError {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => {
                return write!(message, "missing hts-log.txt header line");
            }
            Self::InvalidHeader(line) => {
                return write!(message, "invalid hts-log.txt header: {line}");
            }
            Self::InvalidDate { value, source } => {
                return write!(message, "invalid HTTrack date '{value}': {source}");
            }
            Self::InvalidCacheLine {
                line_number,
                line,
                reason,
            } => {
                return write!(
                    message,
                    "invalid cache line {line_number} ({reason}): {line}"
                );
            }
            Self::Grammar(error_message) => {
                return write!(message, "grammar error: {error_message}");
            }
            Self::Io(error_message) => {
                return write!(message, "could not read HTTrack log: {error_message}");
            }
        }
    }
}
impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDate { source, .. } => return Some(source),
            Self::Grammar(regex_error) => return Some(regex_error),
            Self::Io(io_error) => return Some(io_error),
            Self::MissingHeader | Self::InvalidHeader(_) | Self::InvalidCacheLine { .. } => {
                return None;
            }
        }
    }
}
impl From<std::io::Error> for ParseError {
    fn from(error: std::io::Error) -> Self {
        return Self::Io(error);
    }
}
impl From<regex::Error> for ParseError {
    fn from(error: regex::Error) -> Self {
        return Self::Grammar(error);
    }
}
