//! Constructors for the kinds of record a conversion produces.
//!
//! * `warcinfo`, once at the start of every output file
//! * `resource`, for a mirrored file whose HTTP headers are unknown
//! * `response`, for redirects, with a synthesised HTTP header block

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest as _, Sha256};
use warc::{BufferedBody, Error as WarcError, Record, RecordType, WarcHeader};

/// Content type of a record carrying a complete HTTP response.
pub const HTTP_RESPONSE_CONTENT_TYPE: &str = "application/http; msgtype=response";

/// Format bytes as a `sha256:` prefixed hex digest.
#[must_use]
pub fn sha256_digest(bytes: &[u8]) -> String {
    return format!("sha256:{:x}", Sha256::digest(bytes));
}

fn warc_date(date: DateTime<Utc>) -> String {
    return date.to_rfc3339_opts(SecondsFormat::Secs, true);
}

/// # Create a warcinfo record
///
/// `fields` is an `application/warc-fields` block, one `key: value`
/// per line.
///
/// # Errors
///
/// Returns a `warc::Error` if a header value is rejected.
pub fn info_record(
    file_name: &str,
    fields: &str,
    date: DateTime<Utc>,
) -> Result<Record<BufferedBody>, WarcError> {
    let mut headers = Record::<BufferedBody>::new();
    headers.set_warc_type(RecordType::WarcInfo);
    headers.set_header(WarcHeader::Date, warc_date(date))?;
    headers.set_header(WarcHeader::Filename, file_name)?;
    headers.set_header(WarcHeader::ContentType, "application/warc-fields")?;
    headers.set_header(WarcHeader::BlockDigest, sha256_digest(fields.as_bytes()))?;
    return Ok(headers.add_body(fields));
}

/// # Create a resource record
///
/// The whole body is the payload, so block and payload digests match.
///
/// # Errors
///
/// Returns a `warc::Error` if a header value is rejected, for example
/// when the target URI contains a line break.
pub fn resource_record(
    target_url: &str,
    date: DateTime<Utc>,
    mime_type: &str,
    body: Vec<u8>,
) -> Result<Record<BufferedBody>, WarcError> {
    let digest = sha256_digest(&body);

    let mut headers = Record::<BufferedBody>::new();
    headers.set_warc_type(RecordType::Resource);
    headers.set_header(WarcHeader::Date, warc_date(date))?;
    headers.set_header(WarcHeader::TargetURI, target_url)?;
    headers.set_header(WarcHeader::ContentType, mime_type)?;
    headers.set_header(WarcHeader::BlockDigest, digest.clone())?;
    headers.set_header(WarcHeader::PayloadDigest, digest)?;
    return Ok(headers.add_body(body));
}

/// # Create a redirect response record
///
/// The content block is a bodyless HTTP response whose `Location`
/// header points at `location`.
///
/// # Errors
///
/// Returns a `warc::Error` if a header value is rejected.
pub fn redirect_response(
    target_url: &str,
    location: &str,
    status: u16,
    date: DateTime<Utc>,
) -> Result<Record<BufferedBody>, WarcError> {
    let http_block = format!(
        "HTTP/1.1 {status} {}\r\nLocation: {location}\r\nContent-Length: 0\r\n\r\n",
        reason_phrase(status)
    );

    let mut headers = Record::<BufferedBody>::new();
    headers.set_warc_type(RecordType::Response);
    headers.set_header(WarcHeader::Date, warc_date(date))?;
    headers.set_header(WarcHeader::TargetURI, target_url)?;
    headers.set_header(WarcHeader::ContentType, HTTP_RESPONSE_CONTENT_TYPE)?;
    headers.set_header(WarcHeader::BlockDigest, sha256_digest(http_block.as_bytes()))?;
    headers.set_header(WarcHeader::PayloadDigest, sha256_digest(b""))?;
    return Ok(headers.add_body(http_block));
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        301 => return "Moved Permanently",
        302 => return "Found",
        303 => return "See Other",
        307 => return "Temporary Redirect",
        308 => return "Permanent Redirect",
        _ => return "Redirect",
    }
}
