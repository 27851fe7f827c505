//! Maps files in the mirror back to the URLs they were fetched from.

pub mod link_rewriter;
pub mod mangling;

use crate::httrack::{CrawlRecord, decode_latin1};
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, trace};

/// HTTrack stamps every HTML page it saves with this comment.
const MIRRORED_FROM_GRAMMAR: &str = r"<!-- Mirrored from (?P<location>\S+) by HTTrack Website Copier";

/// Which rule resolved a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The cache log names this exact file.
    Exact,
    /// The file name was demangled, see [`mangling`].
    Demangled,
    /// The page's own "Mirrored from" comment.
    MirroredFrom,
}

/// A mirrored file and the URL it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation<'log> {
    pub url: String,
    pub relative_path: String,
    /// The cache log entry for the URL, when there is one.
    pub record: Option<&'log CrawlRecord>,
    pub resolution: Resolution,
}
impl Correlation<'_> {
    /// The logged mime type, or a guess from the file extension.
    #[must_use]
    pub fn mime_type(&self) -> String {
        return self
            .record
            .map(|record| return record.mime_type.as_str())
            .filter(|mime| return !mime.is_empty() && *mime != "unknown")
            .unwrap_or_else(|| return mangling::mime_from_extension(&self.relative_path))
            .to_owned();
    }
}

pub struct Correlator<'log> {
    by_path: HashMap<String, &'log CrawlRecord>,
    by_folded_path: HashMap<String, &'log CrawlRecord>,
    by_url: HashMap<&'log str, &'log CrawlRecord>,
    /// Only compiled when reading page content is allowed.
    mirrored_from: Option<Regex>,
}
impl<'log> Correlator<'log> {
    /// # Build the correlation table
    ///
    /// `output_dir` is the mirror directory from the HTTrack command line
    /// and `mirror_name` the name of the directory being converted, both
    /// used to make logged paths relative. With `scan_content` the page
    /// content is consulted for files nothing else resolves.
    ///
    /// # Errors
    ///
    /// Returns a `regex::Error` if the content grammar fails to compile.
    pub fn new(
        records: &'log [CrawlRecord],
        output_dir: Option<&str>,
        mirror_name: Option<&str>,
        scan_content: bool,
    ) -> Result<Self, regex::Error> {
        let mut by_path = HashMap::with_capacity(records.len());
        let mut by_folded_path = HashMap::with_capacity(records.len());
        let mut by_url = HashMap::with_capacity(records.len());

        for record in records {
            let Some(saved_path) = record.saved_path() else {
                debug!("{} was not saved (status {})", record.url, record.status);
                continue;
            };
            by_url.entry(record.url.as_str()).or_insert(record);
            if let Some(relative) = mangling::relative_local_path(saved_path, output_dir, mirror_name) {
                by_folded_path.entry(relative.to_lowercase()).or_insert(record);
                // a later fetch of the same path replaces the earlier one
                by_path.insert(relative, record);
            }
        }

        let mirrored_from = if scan_content {
            Some(Regex::new(MIRRORED_FROM_GRAMMAR)?)
        } else {
            None
        };

        return Ok(Self {
            by_path,
            by_folded_path,
            by_url,
            mirrored_from,
        });
    }

    /// # Resolve a file
    ///
    /// Rules are tried in order: an exact match on the logged path, then
    /// demangling, then the page's "Mirrored from" comment. `None` means
    /// no rule applies.
    #[must_use]
    pub fn resolve(&self, relative_path: &str, content: &[u8]) -> Option<Correlation<'log>> {
        if let Some(record) = self.by_path.get(relative_path) {
            return Some(self.correlation(relative_path, record.url.clone(), Resolution::Exact));
        }
        if let Some(url) = self.demangle(relative_path) {
            return Some(self.correlation(relative_path, url, Resolution::Demangled));
        }
        if let Some(url) = self.mirrored_from(relative_path, content) {
            return Some(self.correlation(relative_path, url, Resolution::MirroredFrom));
        }
        return None;
    }

    /// The URL a mirror-relative path stands for, without reading content.
    #[must_use]
    pub fn url_for_path(&self, relative_path: &str) -> Option<String> {
        if let Some(record) = self.by_path.get(relative_path) {
            return Some(record.url.clone());
        }
        return self.demangle(relative_path);
    }

    fn demangle(&self, relative_path: &str) -> Option<String> {
        let decoded = mangling::percent_decode(relative_path);
        if let Some(record) = self.by_path.get(&decoded) {
            return Some(record.url.clone());
        }
        if let Some(record) = self.by_folded_path.get(&relative_path.to_lowercase()) {
            trace!("{relative_path} matched {} ignoring case", record.url);
            return Some(record.url.clone());
        }
        return mangling::url_from_local_path(relative_path);
    }

    fn mirrored_from(&self, relative_path: &str, content: &[u8]) -> Option<String> {
        let grammar = self.mirrored_from.as_ref()?;
        if !mangling::is_html_path(relative_path) {
            return None;
        }
        let text = decode_latin1(content);
        let captures = grammar.captures(&text)?;
        let location = captures.name("location")?.as_str();
        if location.contains("://") {
            return Some(location.to_owned());
        }
        return Some(format!("http://{location}"));
    }

    fn correlation(&self, relative_path: &str, url: String, resolution: Resolution) -> Correlation<'log> {
        let record = self
            .by_path
            .get(relative_path)
            .copied()
            .or_else(|| return self.by_url.get(url.as_str()).copied());
        return Correlation {
            url,
            relative_path: relative_path.to_owned(),
            record,
            resolution,
        };
    }
}
