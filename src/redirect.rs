//! Synthetic redirects from HTTrack-rewritten URLs to original URLs.
//!
//! A mirror served from `prefix` exposes `http://host/path` as
//! `prefix + host/path`. Links in archived copies of the mirror, or
//! bookmarks to it, can then be redirected to the real capture.

use crate::{
    config::Timezone,
    correlator::{Correlation, mangling},
    writer::archive_record::redirect_response,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use url::Url;
use warc::{BufferedBody, Record};

/// A redirect record that is yet to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRedirect {
    /// The URL the mirror exposed.
    pub rewritten_url: String,
    /// The URL the file was originally fetched from.
    pub location: String,
    pub timestamp: DateTime<Utc>,
}
impl SyntheticRedirect {
    pub const STATUS: u16 = 301;

    /// # Create the redirect record
    ///
    /// # Errors
    ///
    /// Returns a `warc::Error` if either URL is not a valid header value.
    pub fn to_record(&self) -> Result<Record<BufferedBody>, warc::Error> {
        return redirect_response(
            &self.rewritten_url,
            &self.location,
            Self::STATUS,
            self.timestamp,
        );
    }
}

pub struct RedirectSynthesizer<'config> {
    prefix: &'config Url,
    launch_time: DateTime<Utc>,
    timezone: Timezone,
}
impl<'config> RedirectSynthesizer<'config> {
    /// `prefix` must end in `/`, which `ConversionConfig` guarantees.
    #[must_use]
    pub fn new(prefix: &'config Url, launch_time: NaiveDateTime, timezone: Timezone) -> Self {
        return Self {
            prefix,
            launch_time: timezone.to_utc(launch_time),
            timezone,
        };
    }

    /// # Synthesise the redirect for one correlated file
    ///
    /// The timestamp is the fetch time from the cache log when known,
    /// otherwise the crawl's launch time. Returns `None` when the
    /// rewritten URL cannot be formed or is the original URL itself.
    #[must_use]
    pub fn synthesize(&self, correlation: &Correlation<'_>) -> Option<SyntheticRedirect> {
        let rewritten_url = mangling::prefixed_url(self.prefix, &correlation.relative_path)?;
        if rewritten_url == correlation.url {
            return None;
        }
        let timestamp = correlation.record.map_or(self.launch_time, |record| {
            return self.timezone.to_utc(record.timestamp);
        });
        return Some(SyntheticRedirect {
            rewritten_url,
            location: correlation.url.clone(),
            timestamp,
        });
    }
}
