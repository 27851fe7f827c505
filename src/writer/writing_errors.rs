use std::{error::Error, fmt, path::PathBuf};

#[derive(Debug)]
pub enum WritingError {
    /// An output file could not be created, written or flushed.
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A record could not be framed or compressed in memory.
    Serialise(std::io::Error),
    Record(warc::Error),
    /// A write found no open output file.
    Closed,
}
impl fmt::Display for WritingError {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, source } => {
                return write!(message, "could not write {}: {source}", path.display());
            }
            Self::Serialise(error_message) => {
                return write!(message, "could not serialise record: {error_message}");
            }
            Self::Record(error_message) => {
                return write!(message, "invalid record: {error_message}");
            }
            Self::Closed => {
                return write!(message, "no output file is open");
            }
        }
    }
}
impl Error for WritingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::File { source, .. } | Self::Serialise(source) => return Some(source),
            Self::Record(warc_error) => return Some(warc_error),
            Self::Closed => return None,
        }
    }
}
impl From<warc::Error> for WritingError {
    fn from(error: warc::Error) -> Self {
        return Self::Record(error);
    }
}
