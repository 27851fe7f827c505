//! Command-line front end for the converter.

use clap::{ArgAction, Parser, error::ErrorKind};
use hts2warc::{
    config::{
        ConversionConfig, ConversionOptions, DEFAULT_NAME_PATTERN, DEFAULT_SIZE_TARGET, Verbosity,
        options_line,
    },
    conversion,
    writer::Compression,
};
use std::{env, path::PathBuf, process::ExitCode};

const USAGE_FAILURE: u8 = 1;
const CONVERSION_FAILURE: u8 = 2;

/// Convert an HTTrack mirror into WARC files.
#[derive(Parser, Debug)]
#[command(name = "hts2warc", version, about, long_about = None)]
struct Cli {
    /// The HTTrack mirror directory, containing hts-log.txt
    #[arg(value_name = "CRAWL_DIR")]
    crawl_directory: PathBuf,

    /// Write a CDXJ index of every record to this file
    #[arg(long, value_name = "FILE")]
    cdx: Option<PathBuf>,

    /// Record compression
    #[arg(short = 'C', long, value_name = "none|gzip", default_value_t = Compression::Gzip)]
    compression: Compression,

    /// Leave out files whose path or URL matches this regex (repeatable)
    #[arg(short = 'x', long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Output file name pattern, %d is the sequence number
    #[arg(short, long, value_name = "PATTERN", default_value = DEFAULT_NAME_PATTERN)]
    name: String,

    /// Directory the WARC files are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    outdir: PathBuf,

    /// Log less (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,

    /// Log more (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write synthetic redirects to a separate file set with this pattern
    #[arg(long, value_name = "PATTERN")]
    redirect_file: Option<String>,

    /// Synthesise redirects from this URL prefix plus the local path
    #[arg(long, value_name = "URL")]
    redirect_prefix: Option<String>,

    /// Replace local links in HTML pages with their original URLs
    #[arg(long)]
    rewrite_links: bool,

    /// Start a new file once this many bytes are written
    #[arg(short, long, value_name = "BYTES", default_value_t = DEFAULT_SIZE_TARGET)]
    size: u64,

    /// Fail on the first warning
    #[arg(long)]
    strict: bool,

    /// Zone the HTTrack timestamps were logged in, defaults to the host zone
    #[arg(short = 'Z', long, value_name = "ZONE")]
    timezone: Option<String>,

    /// Extra 'key: value' line for the warcinfo records (repeatable)
    #[arg(short = 'I', long, value_name = "LINE")]
    warcinfo: Vec<String>,
}
impl Cli {
    fn into_options(self, options_field: String) -> ConversionOptions {
        let mut warcinfo_lines = self.warcinfo;
        warcinfo_lines.push(options_field);
        return ConversionOptions {
            output_directory: self.outdir,
            size_target: self.size,
            name_pattern: self.name,
            timezone: self.timezone,
            compression: self.compression,
            warcinfo_lines,
            exclusions: self.exclude,
            redirect_prefix: self.redirect_prefix,
            redirect_pattern: self.redirect_file,
            cdx_path: self.cdx,
            rewrite_links: self.rewrite_links,
            strict: self.strict,
            verbosity: Verbosity::default()
                .shifted(i32::from(self.verbose) - i32::from(self.quiet)),
        };
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(usage_error) => {
            let _ = usage_error.print();
            match usage_error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => return ExitCode::SUCCESS,
                _ => return ExitCode::from(USAGE_FAILURE),
            }
        }
    };

    let arguments = env::args_os()
        .skip(1)
        .map(|argument| return argument.to_string_lossy().into_owned());
    let options_field = format!("hts2warcOptions: {}", options_line(arguments));
    let crawl_directory = cli.crawl_directory.clone();

    let config = match ConversionConfig::new(cli.into_options(options_field)) {
        Ok(config) => config,
        Err(config_error) => {
            eprintln!("hts2warc: {config_error}");
            return ExitCode::from(USAGE_FAILURE);
        }
    };

    match conversion::convert(&crawl_directory, &config) {
        Ok(summary) => {
            for output_file in &summary.output_files {
                println!("{}", output_file.display());
            }
            return ExitCode::SUCCESS;
        }
        Err(conversion_error) => {
            eprintln!("hts2warc: {conversion_error}");
            return ExitCode::from(CONVERSION_FAILURE);
        }
    }
}
