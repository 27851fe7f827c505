use crate::indexer::indexing_errors::IndexingError;
use std::fmt;
use url::{Position, Url};
use warc::{BufferedBody, Record, WarcHeader};

/// The `WARC-Target-URI` of a record.
pub struct TargetUrl(Url);
impl TargetUrl {
    /// # Errors
    ///
    /// Returns `ValueNotFound` when the record has no target URI, or
    /// `RecordUrlError` when it is not an absolute URL.
    pub fn from_record(record: &Record<BufferedBody>) -> Result<Self, IndexingError> {
        let Some(target_uri) = record.header(WarcHeader::TargetURI) else {
            return Err(IndexingError::ValueNotFound(
                "WARC-Target-URI not present".to_owned(),
            ));
        };
        return Url::parse(&target_uri)
            .map(Self)
            .map_err(IndexingError::RecordUrlError);
    }

    /// # Sort-friendly form of the URL
    ///
    /// Lowercased, without the scheme or fragment, with the host labels
    /// reversed and comma separated, then `)` and the path and query:
    /// `http://www.Example.org:8080/a?b#c` is `org,example,www:8080)/a?b`.
    ///
    /// # Errors
    ///
    /// Returns `ValueNotFound` for URLs without a host.
    pub fn surt(&self) -> Result<String, IndexingError> {
        let Some(host) = self.0.host_str() else {
            return Err(IndexingError::ValueNotFound(format!(
                "{} has no host to build a SURT from",
                self.0
            )));
        };
        let mut surt = host.rsplit('.').collect::<Vec<&str>>().join(",");
        if let Some(port) = self.0.port() {
            surt = format!("{surt}:{port}");
        }
        surt.push(')');
        surt.push_str(&self.0[Position::BeforePath..Position::AfterQuery]);
        return Ok(surt.to_lowercase());
    }
}
impl fmt::Display for TargetUrl {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(message, "{}", self.0);
    }
}
