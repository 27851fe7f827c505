//! Conversion settings.
//!
//! [`ConversionOptions`] is the raw, user-facing form. It is validated
//! exactly once by [`ConversionConfig::new`], after which the config is
//! read-only and passed around by reference.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone as _, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::{
    error::Error,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::writer::Compression;

/// 1 GiB, the usual upper bound for a WARC file.
pub const DEFAULT_SIZE_TARGET: u64 = 1 << 30;
pub const DEFAULT_NAME_PATTERN: &str = "crawl-%d.warc.gz";

/// Matches the sequence number placeholder: `%d` or a zero padded `%05d`.
const PLACEHOLDER_GRAMMAR: &str = r"%(?:0(?P<width>\d+))?d";

/// Logging verbosity, from quietest to noisiest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}
impl Verbosity {
    const LEVELS: [Self; 5] = [
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Trace,
    ];

    /// Move up (positive) or down (negative) the scale, clamped at both ends.
    #[must_use]
    pub fn shifted(self, steps: i32) -> Self {
        let position = i32::try_from(self as usize).unwrap_or_default() + steps;
        let clamped = usize::try_from(position.max(0))
            .unwrap_or_default()
            .min(Self::LEVELS.len() - 1);
        return Self::LEVELS[clamped];
    }

    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Error => return LevelFilter::ERROR,
            Self::Warn => return LevelFilter::WARN,
            Self::Info => return LevelFilter::INFO,
            Self::Debug => return LevelFilter::DEBUG,
            Self::Trace => return LevelFilter::TRACE,
        }
    }
}

/// The zone HTTrack's naive timestamps are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    /// The host's local zone.
    Local,
    Named(Tz),
}
impl Timezone {
    /// Convert a naive timestamp to UTC. Ambiguous times resolve to the
    /// earlier instant, times skipped by a DST change are read as UTC.
    #[must_use]
    pub fn to_utc(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let resolved = match self {
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| return local.with_timezone(&Utc)),
            Self::Named(zone) => zone
                .from_local_datetime(&naive)
                .earliest()
                .map(|zoned| return zoned.with_timezone(&Utc)),
        };
        return resolved.unwrap_or_else(|| return naive.and_utc());
    }
}
impl FromStr for Timezone {
    type Err = ConfigError;

    fn from_str(zone_id: &str) -> Result<Self, Self::Err> {
        match zone_id.parse::<Tz>() {
            Ok(zone) => return Ok(Self::Named(zone)),
            Err(_) => return Err(ConfigError::UnknownTimezone(zone_id.to_owned())),
        }
    }
}

/// An output file name with one sequence number placeholder.
#[derive(Debug, Clone)]
pub struct NamePattern {
    prefix: String,
    suffix: String,
    width: usize,
}
impl NamePattern {
    /// # Parse a name pattern
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNamePattern` unless the pattern holds
    /// exactly one `%d` or `%0Nd` placeholder.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let placeholder = Regex::new(PLACEHOLDER_GRAMMAR).map_err(ConfigError::Grammar)?;
        let mut matches = placeholder.captures_iter(pattern);
        let (Some(captures), None) = (matches.next(), matches.next()) else {
            return Err(ConfigError::InvalidNamePattern(pattern.to_owned()));
        };
        let Some(whole) = captures.get(0) else {
            return Err(ConfigError::InvalidNamePattern(pattern.to_owned()));
        };
        let width = match captures.name("width") {
            Some(width) => width
                .as_str()
                .parse::<usize>()
                .map_err(|_| return ConfigError::InvalidNamePattern(pattern.to_owned()))?,
            None => 0,
        };
        return Ok(Self {
            prefix: pattern[..whole.start()].to_owned(),
            suffix: pattern[whole.end()..].to_owned(),
            width,
        });
    }

    #[must_use]
    pub fn file_name(&self, sequence: u32) -> String {
        return format!(
            "{}{sequence:0width$}{}",
            self.prefix,
            self.suffix,
            width = self.width
        );
    }

    /// Whether the pattern produces gzip file names.
    #[must_use]
    pub fn is_gzip(&self) -> bool {
        return self.suffix.ends_with(".gz");
    }
}

/// Raw conversion settings, as gathered from the command line.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub output_directory: PathBuf,
    pub size_target: u64,
    pub name_pattern: String,
    /// A zone id such as `Australia/Sydney`, `None` for the host zone.
    pub timezone: Option<String>,
    pub compression: Compression,
    /// Extra `key: value` lines for every warcinfo record.
    pub warcinfo_lines: Vec<String>,
    /// Regular expressions matched against file paths and URLs.
    pub exclusions: Vec<String>,
    pub redirect_prefix: Option<String>,
    pub redirect_pattern: Option<String>,
    pub cdx_path: Option<PathBuf>,
    pub rewrite_links: bool,
    pub strict: bool,
    pub verbosity: Verbosity,
}
impl Default for ConversionOptions {
    fn default() -> Self {
        return Self {
            output_directory: PathBuf::from("."),
            size_target: DEFAULT_SIZE_TARGET,
            name_pattern: DEFAULT_NAME_PATTERN.to_owned(),
            timezone: None,
            compression: Compression::Gzip,
            warcinfo_lines: Vec::new(),
            exclusions: Vec::new(),
            redirect_prefix: None,
            redirect_pattern: None,
            cdx_path: None,
            rewrite_links: false,
            strict: false,
            verbosity: Verbosity::default(),
        };
    }
}

/// Validated, immutable conversion settings.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    output_directory: PathBuf,
    size_target: u64,
    name_pattern: NamePattern,
    timezone: Timezone,
    compression: Compression,
    warcinfo_lines: Vec<String>,
    exclusions: Vec<Regex>,
    redirect_prefix: Option<Url>,
    redirect_pattern: Option<NamePattern>,
    cdx_path: Option<PathBuf>,
    rewrite_links: bool,
    strict: bool,
    verbosity: Verbosity,
}
impl ConversionConfig {
    /// # Validate conversion options
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for the first option that is unusable: a
    /// zero size target, a name pattern without exactly one placeholder,
    /// an unknown zone id, an exclusion that is not a valid regular
    /// expression, a redirect prefix that is not an absolute URL, a
    /// redirect file without a redirect prefix, or a warcinfo line that
    /// is not `key: value`.
    pub fn new(options: ConversionOptions) -> Result<Self, ConfigError> {
        if options.size_target == 0 {
            return Err(ConfigError::ZeroSizeTarget);
        }

        let name_pattern = NamePattern::new(&options.name_pattern)?;
        let redirect_pattern = match options.redirect_pattern.as_deref() {
            Some(pattern) => Some(NamePattern::new(pattern)?),
            None => None,
        };

        let timezone = match options.timezone.as_deref() {
            Some(zone_id) => zone_id.parse::<Timezone>()?,
            None => Timezone::Local,
        };

        let exclusions = options
            .exclusions
            .iter()
            .map(|exclusion| return Regex::new(exclusion))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::InvalidExclusion)?;

        let redirect_prefix = match options.redirect_prefix.as_deref() {
            Some(prefix) => {
                let mut prefix = Url::parse(prefix).map_err(ConfigError::InvalidRedirectPrefix)?;
                if !prefix.path().ends_with('/') {
                    let path = format!("{}/", prefix.path());
                    prefix.set_path(&path);
                }
                Some(prefix)
            }
            None => None,
        };
        if redirect_pattern.is_some() && redirect_prefix.is_none() {
            return Err(ConfigError::RedirectFileWithoutPrefix);
        }

        for line in &options.warcinfo_lines {
            let valid = line
                .split_once(':')
                .is_some_and(|(key, _)| return !key.trim().is_empty());
            if !valid || line.contains(['\r', '\n']) {
                return Err(ConfigError::InvalidWarcinfoLine(line.clone()));
            }
        }

        return Ok(Self {
            output_directory: options.output_directory,
            size_target: options.size_target,
            name_pattern,
            timezone,
            compression: options.compression,
            warcinfo_lines: options.warcinfo_lines,
            exclusions,
            redirect_prefix,
            redirect_pattern,
            cdx_path: options.cdx_path,
            rewrite_links: options.rewrite_links,
            strict: options.strict,
            verbosity: options.verbosity,
        });
    }

    #[must_use]
    pub fn output_directory(&self) -> &Path {
        return &self.output_directory;
    }
    #[must_use]
    pub const fn size_target(&self) -> u64 {
        return self.size_target;
    }
    #[must_use]
    pub const fn name_pattern(&self) -> &NamePattern {
        return &self.name_pattern;
    }
    #[must_use]
    pub const fn timezone(&self) -> Timezone {
        return self.timezone;
    }
    #[must_use]
    pub const fn compression(&self) -> Compression {
        return self.compression;
    }
    #[must_use]
    pub fn warcinfo_lines(&self) -> &[String] {
        return &self.warcinfo_lines;
    }
    #[must_use]
    pub const fn redirect_prefix(&self) -> Option<&Url> {
        return self.redirect_prefix.as_ref();
    }
    #[must_use]
    pub const fn redirect_pattern(&self) -> Option<&NamePattern> {
        return self.redirect_pattern.as_ref();
    }
    #[must_use]
    pub fn cdx_path(&self) -> Option<&Path> {
        return self.cdx_path.as_deref();
    }
    #[must_use]
    pub const fn rewrite_links(&self) -> bool {
        return self.rewrite_links;
    }
    #[must_use]
    pub const fn strict(&self) -> bool {
        return self.strict;
    }
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        return self.verbosity;
    }

    /// Whether a file path or URL matches any exclusion.
    #[must_use]
    pub fn is_excluded(&self, path_or_url: &str) -> bool {
        return self
            .exclusions
            .iter()
            .any(|exclusion| return exclusion.is_match(path_or_url));
    }
}

/// Join arguments back into one shell-quoted line, for the warcinfo record.
pub fn options_line<I, S>(arguments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    return arguments
        .into_iter()
        .map(|argument| {
            let argument = argument.as_ref();
            if argument.contains(' ') {
                return format!("'{}'", argument.replace('\'', "'\"'\"'"));
            }
            return argument.to_owned();
        })
        .collect::<Vec<String>>()
        .join(" ");
}

#[derive(Debug)]
pub enum ConfigError {
    ZeroSizeTarget,
    InvalidNamePattern(String),
    UnknownTimezone(String),
    UnknownCompression(String),
    InvalidExclusion(regex::Error),
    InvalidRedirectPrefix(url::ParseError),
    RedirectFileWithoutPrefix,
    InvalidWarcinfoLine(String),
    Grammar(regex::Error),
}
impl fmt::Display for ConfigError {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSizeTarget => {
                return write!(message, "WARC size target must be greater than zero");
            }
            Self::InvalidNamePattern(pattern) => {
                return write!(
                    message,
                    "name pattern '{pattern}' must contain exactly one %d placeholder"
                );
            }
            Self::UnknownTimezone(zone_id) => {
                return write!(message, "unknown timezone '{zone_id}'");
            }
            Self::UnknownCompression(mode) => {
                return write!(message, "unknown compression '{mode}', expected none or gzip");
            }
            Self::InvalidExclusion(error_message) => {
                return write!(message, "invalid exclusion: {error_message}");
            }
            Self::InvalidRedirectPrefix(error_message) => {
                return write!(message, "invalid redirect prefix: {error_message}");
            }
            Self::RedirectFileWithoutPrefix => {
                return write!(message, "--redirect-file requires --redirect-prefix");
            }
            Self::InvalidWarcinfoLine(line) => {
                return write!(message, "warcinfo line '{line}' is not of the form 'key: value'");
            }
            Self::Grammar(error_message) => {
                return write!(message, "grammar error: {error_message}");
            }
        }
    }
}
impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidExclusion(regex_error) | Self::Grammar(regex_error) => {
                return Some(regex_error);
            }
            Self::InvalidRedirectPrefix(url_error) => return Some(url_error),
            Self::ZeroSizeTarget
            | Self::InvalidNamePattern(_)
            | Self::UnknownTimezone(_)
            | Self::UnknownCompression(_)
            | Self::RedirectFileWithoutPrefix
            | Self::InvalidWarcinfoLine(_) => return None,
        }
    }
}
