use crate::httrack::{parse_hts_date, parsing_errors::ParseError, read_latin1_line};
use chrono::{Days, NaiveDateTime, NaiveTime};
use std::io::BufRead;

/// `new.txt` starts with a line naming its columns.
const COLUMN_HEADER_PREFIX: &str = "date\t";
const MINIMUM_COLUMNS: usize = 9;

/// One fetched URL, as listed in `hts-cache/new.txt`.
///
/// The columns are tab separated:
///
/// ```text
/// time  size  flags  status  message  mime  etag/date  url  local-file  (from referrer)  [location]
/// ```
///
/// The trailing location column is only present for redirects. Fetches
/// that failed carry HTTrack's negative error code as their status and
/// usually no local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRecord {
    pub url: String,
    /// The path HTTrack saved the response to, usually absolute.
    pub local_path: Option<String>,
    /// HTTP status, or a negative HTTrack error code.
    pub status: i16,
    pub mime_type: String,
    /// Naive local time of the fetch.
    pub timestamp: NaiveDateTime,
    pub redirect: Option<String>,
}
impl CrawlRecord {
    /// The HTTP status, `None` for a fetch that failed.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        return u16::try_from(self.status)
            .ok()
            .filter(|status| return (100..=599).contains(status));
    }

    /// The logged path of the file HTTrack saved, if the fetch left one.
    #[must_use]
    pub fn saved_path(&self) -> Option<&str> {
        return self.http_status().and(self.local_path.as_deref());
    }
}

/// Iterates over the records of a cache log.
///
/// Each line yields either a record or a `ParseError::InvalidCacheLine`,
/// the caller decides whether a bad line is fatal. Blank lines and the
/// column header are skipped.
pub struct CacheParser<R> {
    reader: R,
    line_number: usize,
    /// The date that time-only timestamps belong to. It advances when
    /// the clock goes backwards, as happens when a crawl runs past midnight.
    current_date: NaiveDateTime,
}
impl<R: BufRead> CacheParser<R> {
    pub const fn new(reader: R, launch_time: NaiveDateTime) -> Self {
        return Self {
            reader,
            line_number: 0,
            current_date: launch_time,
        };
    }

    fn parse_line(&mut self, line: &str) -> Result<CrawlRecord, ParseError> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < MINIMUM_COLUMNS {
            return Err(self.invalid_line(
                line,
                format!("expected at least {MINIMUM_COLUMNS} columns, found {}", columns.len()),
            ));
        }

        let timestamp = self.parse_timestamp(columns[0]).map_err(|error| {
            return self.invalid_line(line, error.to_string());
        })?;

        let status = match columns[3].trim().parse::<i16>() {
            Ok(status) if status < 0 || (100..=599).contains(&status) => status,
            _ => {
                return Err(self.invalid_line(
                    line,
                    format!("status '{}' is not an HTTP status code", columns[3].trim()),
                ));
            }
        };

        let url = columns[7].trim();
        if url.is_empty() {
            return Err(self.invalid_line(line, "empty url".to_owned()));
        }
        let url = if url.contains("://") {
            url.to_owned()
        } else {
            format!("http://{url}")
        };

        let local_path = Some(columns[8].trim())
            .filter(|local_path| return !local_path.is_empty())
            .map(str::to_owned);

        let redirect = columns
            .get(10)
            .map(|location| return location.trim())
            .filter(|location| return !location.is_empty())
            .map(str::to_owned);

        // only an accepted line moves the clock
        self.current_date = timestamp;
        return Ok(CrawlRecord {
            url,
            local_path,
            status,
            mime_type: columns[5].trim().to_owned(),
            timestamp,
            redirect,
        });
    }

    /// Accepts either a full HTTrack date or a time of day.
    fn parse_timestamp(&self, value: &str) -> Result<NaiveDateTime, ParseError> {
        let value = value.trim();
        if let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M:%S") {
            let timestamp = self.current_date.date().and_time(time);
            if timestamp < self.current_date {
                return Ok(timestamp.checked_add_days(Days::new(1)).unwrap_or(timestamp));
            }
            return Ok(timestamp);
        }
        return parse_hts_date(value);
    }

    fn invalid_line(&self, line: &str, reason: String) -> ParseError {
        return ParseError::InvalidCacheLine {
            line_number: self.line_number,
            line: line.to_owned(),
            reason,
        };
    }
}
impl<R: BufRead> Iterator for CacheParser<R> {
    type Item = Result<CrawlRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match read_latin1_line(&mut self.reader) {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(io_error) => return Some(Err(ParseError::Io(io_error))),
            };
            self.line_number += 1;

            if line.trim().is_empty() || line.starts_with(COLUMN_HEADER_PREFIX) {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}
