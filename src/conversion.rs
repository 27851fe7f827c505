//! The conversion pipeline.
//!
//! Parse `hts-log.txt`, parse `hts-cache/new.txt`, walk the mirror,
//! correlate each file with its URL, write its record and any synthetic
//! redirect, index what was written and report a summary.

mod conversion_errors;
mod mirror_files;
mod summary;

pub use conversion_errors::ConversionError;
pub use mirror_files::mirror_files;
pub use summary::ConversionSummary;

use crate::{
    config::{ConversionConfig, NamePattern},
    correlator::{Correlation, Correlator, link_rewriter::LinkRewriter, mangling},
    httrack::{CacheParser, CrawlLog, CrawlRecord, parsing_errors::ParseError},
    indexer::{IndexLine, IndexWriter},
    redirect::RedirectSynthesizer,
    writer::{
        Compression, RolloverWriter, WrittenRecord,
        archive_record::{redirect_response, resource_record},
    },
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    fs::{self, File},
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, warn};
use warc::{BufferedBody, Record};

pub const LOG_FILE: &str = "hts-log.txt";
pub const CACHE_LOG_FILE: &str = "hts-cache/new.txt";

/// Status recorded for files the cache log says nothing about.
const ASSUMED_STATUS: u16 = 200;

/// Decides what a tolerable issue means for the run.
///
/// Lenient policy logs the issue and carries on, strict policy turns the
/// first one into the error that ends the run.
#[derive(Debug)]
pub struct IssuePolicy {
    strict: bool,
    warnings: usize,
}
impl IssuePolicy {
    #[must_use]
    pub const fn new(strict: bool) -> Self {
        return Self {
            strict,
            warnings: 0,
        };
    }

    /// # Report an issue
    ///
    /// # Errors
    ///
    /// Returns the issue itself under strict policy.
    pub fn report(&mut self, issue: ConversionError) -> Result<(), ConversionError> {
        if self.strict {
            return Err(issue);
        }
        warn!("{issue}");
        self.warnings += 1;
        return Ok(());
    }

    #[must_use]
    pub const fn warnings(&self) -> usize {
        return self.warnings;
    }
}

/// # Convert an HTTrack mirror
///
/// Logging goes to stderr at the config's verbosity, for the duration of
/// the call only.
///
/// # Errors
///
/// Returns a `ConversionError` when the log header is unusable, a file
/// cannot be read or written, or, under strict policy, on the first
/// issue. Output files written up to that point are closed and remain
/// readable.
pub fn convert(
    mirror_directory: &Path,
    config: &ConversionConfig,
) -> Result<ConversionSummary, ConversionError> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(config.verbosity().level_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    return tracing::subscriber::with_default(subscriber, || {
        let outcome = run(mirror_directory, config);
        match &outcome {
            Ok(summary) => info!("{summary}"),
            Err(conversion_error) => error!("conversion aborted: {conversion_error}"),
        }
        return outcome;
    });
}

fn run(
    mirror_directory: &Path,
    config: &ConversionConfig,
) -> Result<ConversionSummary, ConversionError> {
    let crawl_log = CrawlLog::from_path(&mirror_directory.join(LOG_FILE))?;
    info!(
        "{} {} launched on {} at {}",
        crawl_log.tool, crawl_log.version, crawl_log.launch_time, crawl_log.seeds_and_filters
    );

    let mut policy = IssuePolicy::new(config.strict());
    let mut summary = ConversionSummary::default();
    let records = read_crawl_records(mirror_directory, &crawl_log, &mut policy, &mut summary)?;
    debug!("{} crawl records", records.len());

    let mirror_name = fs::canonicalize(mirror_directory)
        .ok()
        .and_then(|path| return path.file_name().map(|name| return name.to_string_lossy().into_owned()));
    let correlator = Correlator::new(
        &records,
        crawl_log.output_dir.as_deref(),
        mirror_name.as_deref(),
        config.rewrite_links(),
    )?;
    let rewriter = if config.rewrite_links() {
        Some(LinkRewriter::new(&correlator, config.redirect_prefix())?)
    } else {
        None
    };
    let synthesizer = config
        .redirect_prefix()
        .map(|prefix| return RedirectSynthesizer::new(prefix, crawl_log.launch_time, config.timezone()));

    let files = mirror_files(mirror_directory)?;
    fs::create_dir_all(config.output_directory())
        .map_err(ConversionError::io(config.output_directory()))?;

    let mut conversion = Conversion {
        mirror_directory,
        config,
        correlator: &correlator,
        rewriter: rewriter.as_ref(),
        synthesizer: synthesizer.as_ref(),
        launch_time: config.timezone().to_utc(crawl_log.launch_time),
        outputs: Outputs::open(config, &warcinfo_fields(&crawl_log, config))?,
        policy,
        summary,
    };

    let outcome = files
        .iter()
        .try_for_each(|relative_path| return conversion.convert_file(relative_path));
    let closing = conversion.outputs.close();

    let mut summary = conversion.summary;
    summary.warnings = conversion.policy.warnings();
    summary.output_files = conversion.outputs.files();
    summary.index_lines_written = conversion
        .outputs
        .index
        .as_ref()
        .map_or(0, IndexWriter::lines_written);
    outcome?;
    closing?;
    return Ok(summary);
}

fn read_crawl_records(
    mirror_directory: &Path,
    crawl_log: &CrawlLog,
    policy: &mut IssuePolicy,
    summary: &mut ConversionSummary,
) -> Result<Vec<CrawlRecord>, ConversionError> {
    let cache_path = mirror_directory.join(CACHE_LOG_FILE);
    let file = match File::open(&cache_path) {
        Ok(file) => file,
        Err(io_error) if io_error.kind() == ErrorKind::NotFound => {
            policy.report(ConversionError::MissingCacheLog(cache_path))?;
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConversionError::Io {
                path: cache_path,
                source,
            });
        }
    };

    let mut records = Vec::with_capacity(512);
    for parsed in CacheParser::new(BufReader::new(file), crawl_log.launch_time) {
        match parsed {
            Ok(record) => records.push(record),
            Err(ParseError::Io(source)) => {
                return Err(ConversionError::Io {
                    path: cache_path,
                    source,
                });
            }
            Err(parse_error) => {
                summary.invalid_cache_lines += 1;
                policy.report(ConversionError::Parse(parse_error))?;
            }
        }
    }
    return Ok(records);
}

/// The `application/warc-fields` block of every warcinfo record.
fn warcinfo_fields(crawl_log: &CrawlLog, config: &ConversionConfig) -> String {
    let launched = config
        .timezone()
        .to_utc(crawl_log.launch_time)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut lines = vec![
        format!("software: {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        "format: WARC File Format 1.0".to_owned(),
        format!("httrackVersion: {} {}", crawl_log.tool, crawl_log.version),
        format!("httrackLaunched: {launched}"),
        format!("httrackSeeds: {}", crawl_log.seeds_and_filters),
    ];
    if let Some(command_line) = &crawl_log.command_line {
        lines.push(format!("httrackOptions: {command_line}"));
    }
    lines.extend(config.warcinfo_lines().iter().cloned());

    let mut fields = lines.join("\r\n");
    fields.push_str("\r\n");
    return fields;
}

/// The output file sets of a run and the optional index.
struct Outputs {
    content: RolloverWriter,
    /// Present when redirects go to their own file set.
    redirects: Option<RolloverWriter>,
    index: Option<IndexWriter>,
}
impl Outputs {
    fn open(config: &ConversionConfig, warcinfo_fields: &str) -> Result<Self, ConversionError> {
        if config.compression() == Compression::None && config.name_pattern().is_gzip() {
            warn!(
                "writing uncompressed records to {}",
                config.name_pattern().file_name(0)
            );
        }
        let rollover_writer = |pattern: &NamePattern| {
            return RolloverWriter::new(
                config.output_directory(),
                pattern.clone(),
                config.size_target(),
                config.compression(),
                warcinfo_fields.to_owned(),
            );
        };
        let index = match config.cdx_path() {
            Some(cdx_path) => Some(IndexWriter::create(cdx_path)?),
            None => None,
        };
        return Ok(Self {
            content: rollover_writer(config.name_pattern()),
            redirects: config.redirect_pattern().map(rollover_writer),
            index,
        });
    }

    /// Close everything, reporting the first failure.
    fn close(&mut self) -> Result<(), ConversionError> {
        let content = self.content.close();
        let redirects = self
            .redirects
            .as_mut()
            .map_or(Ok(()), RolloverWriter::close);
        let index = self.index.as_mut().map_or(Ok(()), |index| {
            info!(
                "{} index lines in {}",
                index.lines_written(),
                index.path().display()
            );
            return index.flush();
        });
        content?;
        redirects?;
        index?;
        return Ok(());
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files = self.content.files().to_vec();
        if let Some(redirects) = &self.redirects {
            files.extend_from_slice(redirects.files());
        }
        return files;
    }
}

/// State of one run while the mirror is walked.
struct Conversion<'run, 'log> {
    mirror_directory: &'run Path,
    config: &'run ConversionConfig,
    correlator: &'run Correlator<'log>,
    rewriter: Option<&'run LinkRewriter<'run, 'log>>,
    synthesizer: Option<&'run RedirectSynthesizer<'run>>,
    launch_time: DateTime<Utc>,
    outputs: Outputs,
    policy: IssuePolicy,
    summary: ConversionSummary,
}
impl Conversion<'_, '_> {
    fn convert_file(&mut self, relative_path: &str) -> Result<(), ConversionError> {
        self.summary.files_seen += 1;
        if self.config.is_excluded(relative_path) {
            debug!("excluded {relative_path}");
            self.summary.excluded += 1;
            return Ok(());
        }

        let path = self.mirror_directory.join(relative_path);
        let content = fs::read(&path).map_err(ConversionError::io(&path))?;

        let Some(correlation) = self.correlator.resolve(relative_path, &content) else {
            self.summary.skipped += 1;
            return self.policy.report(ConversionError::Correlation {
                path: relative_path.to_owned(),
            });
        };
        if self.config.is_excluded(&correlation.url) {
            debug!("excluded {} ({relative_path})", correlation.url);
            self.summary.excluded += 1;
            return Ok(());
        }
        debug!(
            "{relative_path} -> {} ({:?})",
            correlation.url, correlation.resolution
        );

        let Some(mut record) = self.content_record(&correlation, content)? else {
            self.summary.skipped += 1;
            return Ok(());
        };
        let status = correlation
            .record
            .and_then(CrawlRecord::http_status)
            .unwrap_or(ASSUMED_STATUS);
        let written = self.outputs.content.write(&mut record)?;
        self.index(&record, &written, status)?;
        self.summary.records_written += 1;

        if let Some(synthesizer) = self.synthesizer {
            if let Some(redirect) = synthesizer.synthesize(&correlation) {
                self.write_redirect(&redirect.rewritten_url, redirect.to_record())?;
            }
        }
        return Ok(());
    }

    /// A `response` for a logged redirect, otherwise a `resource`.
    /// `None` when the record cannot be built and the policy tolerates it.
    fn content_record(
        &mut self,
        correlation: &Correlation<'_>,
        content: Vec<u8>,
    ) -> Result<Option<Record<BufferedBody>>, ConversionError> {
        let timezone = self.config.timezone();
        let timestamp = correlation
            .record
            .map_or(self.launch_time, |crawl_record| return timezone.to_utc(crawl_record.timestamp));
        let logged_redirect = correlation.record.and_then(|crawl_record| {
            let location = crawl_record.redirect.as_deref()?;
            let status = crawl_record.http_status()?;
            return (300..400).contains(&status).then_some((status, location));
        });

        let built = match logged_redirect {
            Some((status, location)) => redirect_response(&correlation.url, location, status, timestamp),
            None => {
                let mime_type = correlation.mime_type();
                let body = match self.rewriter {
                    Some(rewriter)
                        if mime_type.starts_with("text/html")
                            || mangling::is_html_path(&correlation.relative_path) =>
                    {
                        rewriter.rewrite(&correlation.relative_path, &content)
                    }
                    _ => content,
                };
                resource_record(&correlation.url, timestamp, &mime_type, body)
            }
        };
        match built {
            Ok(record) => return Ok(Some(record)),
            Err(source) => {
                self.policy.report(ConversionError::Record {
                    url: correlation.url.clone(),
                    source,
                })?;
                return Ok(None);
            }
        }
    }

    fn write_redirect(
        &mut self,
        rewritten_url: &str,
        built: Result<Record<BufferedBody>, warc::Error>,
    ) -> Result<(), ConversionError> {
        let mut record = match built {
            Ok(record) => record,
            Err(source) => {
                return self.policy.report(ConversionError::Record {
                    url: rewritten_url.to_owned(),
                    source,
                });
            }
        };
        let rollover_writer = self
            .outputs
            .redirects
            .as_mut()
            .unwrap_or(&mut self.outputs.content);
        let written = rollover_writer.write(&mut record)?;
        self.index(&record, &written, ASSUMED_STATUS)?;
        self.summary.redirects_written += 1;
        return Ok(());
    }

    fn index(
        &mut self,
        record: &Record<BufferedBody>,
        written: &WrittenRecord,
        resource_status: u16,
    ) -> Result<(), ConversionError> {
        let Some(index) = self.outputs.index.as_mut() else {
            return Ok(());
        };
        match IndexLine::new(record, written, resource_status) {
            Ok(line) => {
                index.append(&line)?;
                return Ok(());
            }
            Err(indexing_error) => {
                return self.policy.report(ConversionError::Indexing(indexing_error));
            }
        }
    }
}
