use std::{fmt, path::PathBuf};

/// What a conversion run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub files_seen: usize,
    /// Records for mirrored files, not counting warcinfo records.
    pub records_written: usize,
    pub redirects_written: usize,
    pub index_lines_written: usize,
    pub excluded: usize,
    /// Files left out because they could not be correlated or recorded.
    pub skipped: usize,
    pub invalid_cache_lines: usize,
    /// Issues that were logged and tolerated.
    pub warnings: usize,
    pub output_files: Vec<PathBuf>,
}
impl fmt::Display for ConversionSummary {
    fn fmt(&self, message: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(
            message,
            "{} files seen, {} records and {} redirects written to {} files, {} excluded, {} skipped, {} invalid cache lines, {} warnings",
            self.files_seen,
            self.records_written,
            self.redirects_written,
            self.output_files.len(),
            self.excluded,
            self.skipped,
            self.invalid_cache_lines,
            self.warnings
        );
    }
}
