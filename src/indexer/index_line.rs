use crate::{
    indexer::{RecordTimestamp, TargetUrl, indexing_errors::IndexingError},
    writer::{WrittenRecord, archive_record::sha256_digest},
};
use serde::Serialize;
use warc::{BufferedBody, Record, RecordType, WarcHeader};

/// Mime type recorded when a response carries no `Content-Type`.
const UNKNOWN_MIME: &str = "unk";

/// The JSON block of a CDXJ line.
#[derive(Debug, Serialize)]
struct CdxjFields<'line> {
    url: &'line str,
    digest: &'line str,
    mime: &'line str,
    offset: u64,
    length: u64,
    status: u16,
    filename: &'line str,
}

/// One line of a CDXJ index, describing a written record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLine {
    pub searchable_url: String,
    pub timestamp: String,
    pub url: String,
    pub digest: String,
    pub mime_type: String,
    pub status: u16,
    pub offset: u64,
    pub length: u64,
    pub file_name: String,
}
impl IndexLine {
    /// # Create index line
    ///
    /// For `response` records the status and mime type come from the
    /// HTTP header block. A `resource` record has no status of its own,
    /// so `resource_status` is used, which should be the status the
    /// crawler saw when it fetched the file.
    ///
    /// # Errors
    ///
    /// Returns `UnindexableRecordType` for any other record type, or
    /// the url, timestamp and HTTP parsing errors of the fields.
    pub fn new(
        record: &Record<BufferedBody>,
        written: &WrittenRecord,
        resource_status: u16,
    ) -> Result<Self, IndexingError> {
        let url = TargetUrl::from_record(record)?;
        let timestamp = RecordTimestamp::new(record)?;

        let (status, mime_type) = match record.warc_type() {
            RecordType::Response | RecordType::Revisit => http_status_and_mime(record.body())?,
            RecordType::Resource => (
                resource_status,
                record
                    .header(WarcHeader::ContentType)
                    .map_or_else(|| return UNKNOWN_MIME.to_owned(), |mime| return mime.into_owned()),
            ),
            other => return Err(IndexingError::UnindexableRecordType(other.clone())),
        };

        let digest = record
            .header(WarcHeader::PayloadDigest)
            .map_or_else(|| return sha256_digest(record.body()), |digest| return digest.into_owned());

        return Ok(Self {
            searchable_url: url.surt()?,
            timestamp: timestamp.to_string(),
            url: url.to_string(),
            digest,
            mime_type,
            status,
            offset: written.offset,
            length: written.length,
            file_name: written.file_name.clone(),
        });
    }

    /// # Format as CDXJ
    ///
    /// # Errors
    ///
    /// Returns `JsonError` if the JSON block cannot be serialised.
    pub fn to_cdxj_string(&self) -> Result<String, IndexingError> {
        let fields = CdxjFields {
            url: &self.url,
            digest: &self.digest,
            mime: &self.mime_type,
            offset: self.offset,
            length: self.length,
            status: self.status,
            filename: &self.file_name,
        };
        let json = serde_json::to_string(&fields).map_err(IndexingError::JsonError)?;
        return Ok(format!("{} {} {json}", self.searchable_url, self.timestamp));
    }
}

fn http_status_and_mime(http_block: &[u8]) -> Result<(u16, String), IndexingError> {
    let mut http_headers = [httparse::EMPTY_HEADER; 64];
    let mut response = httparse::Response::new(&mut http_headers);
    if response
        .parse(http_block)
        .map_err(IndexingError::HttpParseError)?
        .is_partial()
    {
        return Err(IndexingError::ValueNotFound(
            "incomplete HTTP header block".to_owned(),
        ));
    }
    let Some(status) = response.code else {
        return Err(IndexingError::ValueNotFound(
            "HTTP status code not present".to_owned(),
        ));
    };
    let mime_type = response
        .headers
        .iter()
        .find(|header| return header.name.eq_ignore_ascii_case("content-type"))
        .and_then(|header| return std::str::from_utf8(header.value).ok())
        .and_then(|value| return value.split(';').next())
        .map_or_else(|| return UNKNOWN_MIME.to_owned(), |value| return value.trim().to_owned());
    return Ok((status, mime_type));
}
