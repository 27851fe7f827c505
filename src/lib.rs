//! Convert HTTrack website mirrors into WARC files.
//!
//! A mirror directory holds the files HTTrack saved, its `hts-log.txt`
//! and the per-URL cache log in `hts-cache/new.txt`. [`conversion::convert`]
//! reads both logs, works out which URL every saved file was fetched
//! from, and writes each file as a record into size-bounded WARC files,
//! optionally with a CDXJ index and with redirect records from the
//! rewritten local URLs to the original ones.
//!
//! ```no_run
//! use hts2warc::config::{ConversionConfig, ConversionOptions};
//! use std::path::Path;
//!
//! let config = ConversionConfig::new(ConversionOptions::default())?;
//! let summary = hts2warc::conversion::convert(Path::new("mirror"), &config)?;
//! println!("{summary}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod conversion;
pub mod correlator;
pub mod httrack;
pub mod indexer;
pub mod redirect;
pub mod writer;
