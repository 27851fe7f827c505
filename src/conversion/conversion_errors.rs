use crate::{
    config::ConfigError, httrack::parsing_errors::ParseError,
    indexer::indexing_errors::IndexingError, writer::writing_errors::WritingError,
};
use std::{error::Error, fmt, path::PathBuf};

#[derive(Debug)]
pub enum ConversionError {
    /// The log header is unusable, or a cache line is malformed.
    Parse(ParseError),
    /// No rule maps a mirrored file to a URL.
    Correlation { path: String },
    MissingCacheLog(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Config(ConfigError),
    /// A record could not be built for a URL.
    Record { url: String, source: warc::Error },
    Writing(WritingError),
    Indexing(IndexingError),
    Grammar(regex::Error),
}
impl ConversionError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        return move |source| return Self::Io { path, source };
    }
}
impl fmt::Display for ConversionError {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error_message) => return write!(message, "{error_message}"),
            Self::Correlation { path } => {
                return write!(message, "unable to determine the URL of {path}");
            }
            Self::MissingCacheLog(path) => {
                return write!(
                    message,
                    "{} not found, URLs will be guessed from file names",
                    path.display()
                );
            }
            Self::Io { path, source } => {
                return write!(message, "{}: {source}", path.display());
            }
            Self::Config(error_message) => {
                return write!(message, "configuration error: {error_message}");
            }
            Self::Record { url, source } => {
                return write!(message, "could not build record for {url}: {source}");
            }
            Self::Writing(error_message) => return write!(message, "{error_message}"),
            Self::Indexing(error_message) => return write!(message, "{error_message}"),
            Self::Grammar(error_message) => {
                return write!(message, "grammar error: {error_message}");
            }
        }
    }
}
impl Error for ConversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(parse_error) => return Some(parse_error),
            Self::Io { source, .. } => return Some(source),
            Self::Config(config_error) => return Some(config_error),
            Self::Record { source, .. } => return Some(source),
            Self::Writing(writing_error) => return Some(writing_error),
            Self::Indexing(indexing_error) => return Some(indexing_error),
            Self::Grammar(regex_error) => return Some(regex_error),
            Self::Correlation { .. } | Self::MissingCacheLog(_) => return None,
        }
    }
}
impl From<ParseError> for ConversionError {
    fn from(error: ParseError) -> Self {
        return Self::Parse(error);
    }
}
impl From<ConfigError> for ConversionError {
    fn from(error: ConfigError) -> Self {
        return Self::Config(error);
    }
}
impl From<WritingError> for ConversionError {
    fn from(error: WritingError) -> Self {
        return Self::Writing(error);
    }
}
impl From<IndexingError> for ConversionError {
    fn from(error: IndexingError) -> Self {
        return Self::Indexing(error);
    }
}
impl From<regex::Error> for ConversionError {
    fn from(error: regex::Error) -> Self {
        return Self::Grammar(error);
    }
}
